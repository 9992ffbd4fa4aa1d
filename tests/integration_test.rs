use image::{ImageFormat, Rgba, RgbaImage};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::Cursor;
use std::net::TcpStream;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{Duration, Instant};

// Use atomic counter to give each test a unique port
static PORT_COUNTER: AtomicU16 = AtomicU16::new(9500);

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    code: String,
}

struct TestServer {
    child: Child,
    port: u16,
}

impl TestServer {
    /// Start the server with a shell script standing in for the recognizer
    fn start() -> Self {
        let port = PORT_COUNTER.fetch_add(1, Ordering::SeqCst);

        let child = Command::new(env!("CARGO_BIN_EXE_inkmath-server"))
            .args(["--host", "127.0.0.1", "--port", &port.to_string()])
            .args(["--recognizers", "command", "--recognizer-program", "sh"])
            .args([
                "--recognizer-arg=-c",
                "--recognizer-arg",
                "echo 'x^2+2x+1'",
                "--recognizer-arg",
                "sh",
            ])
            .spawn()
            .expect("Failed to start server");

        // Wait for server to be ready
        let deadline = Instant::now() + Duration::from_secs(10);
        while TcpStream::connect(("127.0.0.1", port)).is_err() {
            assert!(Instant::now() < deadline, "server did not start on port {}", port);
            std::thread::sleep(Duration::from_millis(50));
        }

        Self { child, port }
    }

    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
    }
}

fn canvas_png(draw: bool) -> Vec<u8> {
    let mut pixels = RgbaImage::new(600, 300);
    if draw {
        for x in 200..260 {
            for y in 140..150 {
                pixels.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
    }
    let mut bytes = Cursor::new(Vec::new());
    pixels
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("Failed to encode canvas");
    bytes.into_inner()
}

fn canvas_form(draw: bool) -> Form {
    let part = Part::bytes(canvas_png(draw))
        .file_name("canvas.png")
        .mime_str("image/png")
        .unwrap();
    Form::new().part("file", part)
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = TestServer::start();
    let client = reqwest::Client::new();

    let response: HealthResponse = client
        .get(server.url("/health"))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    assert_eq!(response.status, "ok");
    assert_eq!(response.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_info_endpoint() {
    let server = TestServer::start();
    let client = reqwest::Client::new();

    let info: Value = client
        .get(server.url("/info"))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    assert_eq!(info["default_recognizer"], "command");
    assert_eq!(info["recognizers"][0]["name"], "command");
    assert_eq!(info["border"], 20);
    assert_eq!(info["plot"]["samples"], 400);
    assert_eq!(info["plot"]["policy"], "skip");
}

#[tokio::test]
async fn test_recognize_drawing() {
    let server = TestServer::start();
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/recognize"))
        .multipart(canvas_form(true))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");

    assert_eq!(body["status"], "recognized");
    assert_eq!(body["recognizer"], "command");
    assert_eq!(body["latex"], "x^2+2x+1");
    assert_eq!(body["preprocessing"]["width"], 100);
    assert_eq!(body["preprocessing"]["height"], 50);
    assert_eq!(
        body["preprocessing"]["ink_box"],
        json!({"x": 200, "y": 140, "width": 60, "height": 10})
    );

    let expression = &body["expression"];
    assert_eq!(expression["rendered"]["latex"], "x^2+2x+1");
    assert_eq!(expression["simplified"]["ok"], true);
    assert_eq!(
        expression["simplified"]["value"]["latex"],
        "\\left(x + 1\\right)^{2}"
    );
    assert_eq!(expression["symbolic"]["value"]["free_variables"], json!(["x"]));
    assert_eq!(expression["plot"]["status"], "plotted");
    assert_eq!(expression["plot"]["samples"], 400);

    assert_eq!(body["download"]["file_name"], "math_output.tex");
    assert_eq!(body["download"]["mime_type"], "text/plain");
    assert_eq!(body["download"]["content"], "x^2+2x+1");
}

#[tokio::test]
async fn test_recognize_blank_raw_canvas() {
    let server = TestServer::start();
    let client = reqwest::Client::new();

    let form = Form::new()
        .part("rgba", Part::bytes(vec![0u8; 60 * 30 * 4]))
        .text("width", "60")
        .text("height", "30");

    let body: Value = client
        .post(server.url("/recognize"))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    assert_eq!(body["status"], "no_ink");
}

#[tokio::test]
async fn test_preprocess_returns_png() {
    let server = TestServer::start();
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/preprocess"))
        .multipart(canvas_form(true))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");

    let bytes = response.bytes().await.expect("Failed to read body");
    let image = image::load_from_memory(&bytes).expect("Failed to decode PNG");
    assert_eq!((image.width(), image.height()), (100, 50));

    let response = client
        .post(server.url("/preprocess"))
        .multipart(canvas_form(false))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_plot_endpoint() {
    let server = TestServer::start();
    let client = reqwest::Client::new();

    let plot = |latex: &str| {
        client
            .post(server.url("/plot"))
            .json(&json!({ "latex": latex }))
            .send()
    };

    let response = plot("x^2 = 4").await.expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");

    let response = plot("x + y").await.expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = plot("\\frac{1}{0}").await.expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error: ErrorResponse = response.json().await.expect("Failed to parse response");
    assert_eq!(error.code, "EVALUATION_ERROR");
    assert!(error.error.contains("division by zero"));
}

#[tokio::test]
async fn test_download_endpoints() {
    let server = TestServer::start();
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/download"))
        .json(&json!({ "latex": "\\sqrt{2}" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"math_output.tex\""
    );
    assert_eq!(response.text().await.unwrap(), "\\sqrt{2}");

    let response = client
        .post(server.url("/recognize/download"))
        .multipart(canvas_form(true))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "x^2+2x+1");
}

#[tokio::test]
async fn test_missing_canvas() {
    let server = TestServer::start();
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/recognize"))
        .multipart(Form::new().text("recognizer", "command"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: ErrorResponse = response.json().await.expect("Failed to parse response");
    assert_eq!(error.code, "MISSING_FILE");
}

#[tokio::test]
async fn test_unknown_recognizer() {
    let server = TestServer::start();
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/recognize"))
        .multipart(canvas_form(true).text("recognizer", "tesseract"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: ErrorResponse = response.json().await.expect("Failed to parse response");
    assert_eq!(error.code, "UNKNOWN_RECOGNIZER");
}
