use crate::canvas::{CanvasImage, InkBox};
use crate::config::Config;
use crate::error::InkMathError;
use crate::pipeline::plot::{self, PlotPoint, PlotSettings};
use crate::pipeline::{
    ExpressionPipeline, ExpressionReport, PlotOutcome, RenderedForm, SimplifiedForm, SymbolicForm,
};
use crate::preprocessing::{PreprocessingResult, Preprocessor, StepTiming};
use crate::recognizers::{RecognizerInfo, RecognizerRegistry};
use crate::service::{DownloadPayload, RecognitionOutcome, RecognitionService};
use crate::symbolic::SymbolicError;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Allowance for multipart framing and the non-canvas form fields, on top of
/// the canvas size limit
const FORM_OVERHEAD: usize = 64 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RecognitionService>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Build every long-lived collaborator from the configuration
    pub fn from_config(config: Config) -> Result<Self, InkMathError> {
        let registry = RecognizerRegistry::new(&config)?;
        Ok(Self::with_registry(config, registry))
    }

    /// Use an already initialized recognizer registry
    pub fn with_registry(config: Config, registry: RecognizerRegistry) -> Self {
        let service = RecognitionService::new(
            Preprocessor::new(config.border),
            Arc::new(registry),
            Arc::new(ExpressionPipeline::with_settings(config.plot.clone())),
        );
        Self {
            service: Arc::new(service),
            config: Arc::new(config),
        }
    }
}

/// JSON body of the LaTeX-only endpoints
#[derive(Debug, Deserialize)]
pub struct LatexRequest {
    pub latex: String,
}

#[derive(Serialize)]
pub struct PreprocessingView {
    pub width: u32,
    pub height: u32,
    pub ink_box: InkBox,
    pub border: u32,
    pub total_time_us: u64,
    pub steps: Vec<StepTiming>,
}

impl From<&PreprocessingResult> for PreprocessingView {
    fn from(result: &PreprocessingResult) -> Self {
        Self {
            width: result.width,
            height: result.height,
            ink_box: result.ink_box,
            border: result.border,
            total_time_us: result.total_time_us,
            steps: result.steps.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct StageErrorView {
    pub kind: &'static str,
    pub message: String,
}

impl From<&SymbolicError> for StageErrorView {
    fn from(error: &SymbolicError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Either a stage's value or why it failed
#[derive(Serialize)]
pub struct StageView<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StageErrorView>,
}

impl<T> StageView<T> {
    fn from_result<E>(result: Result<T, E>) -> Self
    where
        SymbolicError: From<E>,
    {
        match result {
            Ok(value) => Self {
                ok: true,
                value: Some(value),
                error: None,
            },
            Err(e) => Self {
                ok: false,
                value: None,
                error: Some(StageErrorView::from(&SymbolicError::from(e))),
            },
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlotView {
    Plotted {
        variable: String,
        samples: usize,
        skipped: usize,
        points: Vec<PlotPoint>,
    },
    Skipped {
        free_variables: Vec<String>,
        message: String,
    },
    Failed {
        kind: &'static str,
        message: String,
    },
}

impl From<PlotOutcome> for PlotView {
    fn from(outcome: PlotOutcome) -> Self {
        match outcome {
            PlotOutcome::Plotted(series) => PlotView::Plotted {
                samples: series.points.len(),
                skipped: series.skipped(),
                variable: series.variable,
                points: series.points,
            },
            PlotOutcome::Skipped { free_variables } => PlotView::Skipped {
                message: format!(
                    "Cannot plot: expected one free variable, found {}",
                    free_variables.len()
                ),
                free_variables,
            },
            PlotOutcome::Failed(e) => PlotView::Failed {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }
}

#[derive(Serialize)]
pub struct ExpressionView {
    pub rendered: RenderedForm,
    pub symbolic: StageView<SymbolicForm>,
    pub simplified: StageView<SimplifiedForm>,
    pub plot: PlotView,
}

impl From<ExpressionReport> for ExpressionView {
    fn from(report: ExpressionReport) -> Self {
        Self {
            rendered: report.rendered,
            symbolic: StageView::from_result(report.symbolic),
            simplified: StageView::from_result(report.simplified),
            plot: PlotView::from(report.plot),
        }
    }
}

/// Recognition response, tagged by `status`
#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecognizeResponse {
    NoInk {
        message: String,
        processing_time_ms: u64,
    },
    NoExpression {
        recognizer: String,
        preprocessing: PreprocessingView,
        raw_output: serde_json::Value,
        message: String,
        processing_time_ms: u64,
    },
    Recognized {
        recognizer: String,
        preprocessing: PreprocessingView,
        latex: String,
        expression: ExpressionView,
        download: DownloadPayload,
        processing_time_ms: u64,
    },
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub recognizers: Vec<RecognizerInfo>,
    pub default_recognizer: String,
    pub max_file_size_bytes: usize,
    pub border: u32,
    pub plot: PlotSettings,
}

/// Build the router with all routes and layers
pub fn router(state: AppState) -> Router {
    let max_file_size = state.config.max_file_size;

    Router::new()
        .route("/recognize", post(handle_recognize))
        .route("/recognize/download", post(handle_recognize_download))
        .route("/preprocess", post(handle_preprocess))
        .route("/expression", post(handle_expression))
        .route("/plot", post(handle_plot))
        .route("/download", post(handle_download))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(max_file_size.saturating_add(FORM_OVERHEAD)))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::from_config(config)?;
    tracing::info!(
        "Recognizers: {:?} (default: {})",
        state.service.registry().list(),
        state.service.registry().default_name()
    );

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Canvas and recognizer choice from a multipart form
struct CanvasRequest {
    canvas: CanvasImage,
    recognizer: Option<String>,
}

async fn read_canvas(
    mut multipart: Multipart,
    max_file_size: usize,
) -> Result<CanvasRequest, InkMathError> {
    let mut file_data: Option<Bytes> = None;
    let mut rgba_data: Option<Bytes> = None;
    let mut width: Option<u32> = None;
    let mut height: Option<u32> = None;
    let mut recognizer: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| InkMathError::InvalidRequest(format!("Failed to parse multipart: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" | "rgba" => {
                let data = field.bytes().await.map_err(|e| {
                    InkMathError::InvalidRequest(format!("Failed to read {} data: {}", name, e))
                })?;
                if data.len() > max_file_size {
                    return Err(InkMathError::ImageTooLarge {
                        size: data.len(),
                        max: max_file_size,
                    });
                }
                if name == "file" {
                    file_data = Some(data);
                } else {
                    rgba_data = Some(data);
                }
            }
            "width" | "height" => {
                let text = field.text().await.map_err(|e| {
                    InkMathError::InvalidRequest(format!("Invalid {}: {}", name, e))
                })?;
                let value = text.trim().parse::<u32>().map_err(|e| {
                    InkMathError::InvalidRequest(format!("Invalid {} '{}': {}", name, text, e))
                })?;
                if name == "width" {
                    width = Some(value);
                } else {
                    height = Some(value);
                }
            }
            "recognizer" => {
                let text = field.text().await.map_err(|e| {
                    InkMathError::InvalidRequest(format!("Invalid recognizer: {}", e))
                })?;
                let text = text.trim();
                if !text.is_empty() {
                    recognizer = Some(text.to_string());
                }
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let canvas = match (file_data, rgba_data) {
        (Some(data), _) => CanvasImage::decode(&data)?,
        (None, Some(data)) => {
            let (Some(width), Some(height)) = (width, height) else {
                return Err(InkMathError::InvalidRequest(
                    "raw rgba canvas needs width and height fields".to_string(),
                ));
            };
            CanvasImage::from_raw(width, height, data.to_vec())?
        }
        (None, None) => return Err(InkMathError::MissingFile),
    };

    Ok(CanvasRequest { canvas, recognizer })
}

/// Run blocking recognition work off the async runtime
async fn blocking<T, F>(work: F) -> Result<T, InkMathError>
where
    F: FnOnce() -> Result<T, InkMathError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| InkMathError::Internal(format!("Worker task failed: {}", e)))?
}

/// Handle canvas recognition requests
async fn handle_recognize(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<RecognizeResponse>, InkMathError> {
    let start = Instant::now();
    let request = read_canvas(multipart, state.config.max_file_size).await?;

    let service = state.service.clone();
    let outcome = blocking(move || {
        service.recognize(&request.canvas, request.recognizer.as_deref())
    })
    .await?;

    let processing_time_ms = start.elapsed().as_millis() as u64;
    let response = match outcome {
        RecognitionOutcome::NoInk => RecognizeResponse::NoInk {
            message: "No ink detected; draw an expression first".to_string(),
            processing_time_ms,
        },
        RecognitionOutcome::NoExpression {
            preprocessing,
            recognizer,
            raw_output,
        } => {
            tracing::warn!("{} returned no usable expression", recognizer);
            RecognizeResponse::NoExpression {
                preprocessing: PreprocessingView::from(&preprocessing),
                recognizer,
                raw_output: raw_output.into_value(),
                message: "No expression detected".to_string(),
                processing_time_ms,
            }
        }
        RecognitionOutcome::Recognized {
            preprocessing,
            recognizer,
            latex,
            report,
            download,
        } => {
            tracing::info!(
                "Recognition completed in {}ms with {}: {:?}",
                processing_time_ms,
                recognizer,
                latex
            );
            RecognizeResponse::Recognized {
                preprocessing: PreprocessingView::from(&preprocessing),
                recognizer,
                latex,
                expression: ExpressionView::from(report),
                download,
                processing_time_ms,
            }
        }
    };

    Ok(Json(response))
}

/// Recognize a canvas and return the raw LaTeX as a file download
async fn handle_recognize_download(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, InkMathError> {
    let request = read_canvas(multipart, state.config.max_file_size).await?;
    let service = state.service.clone();
    let latex = blocking(move || {
        service.recognize_latex(&request.canvas, request.recognizer.as_deref())
    })
    .await?;
    Ok(attachment(DownloadPayload::new(latex)))
}

/// Return the processed canvas as PNG, or 204 when nothing was drawn
async fn handle_preprocess(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, InkMathError> {
    let request = read_canvas(multipart, state.config.max_file_size).await?;
    let service = state.service.clone();
    let png = blocking(move || {
        service
            .preprocessor()
            .process(&request.canvas)?
            .map(|result| result.image.to_png())
            .transpose()
    })
    .await?;

    Ok(match png {
        Some(png) => ([(header::CONTENT_TYPE, "image/png")], png).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// Run the expression pipeline on a LaTeX string
async fn handle_expression(
    State(state): State<AppState>,
    Json(request): Json<LatexRequest>,
) -> Result<Json<ExpressionView>, InkMathError> {
    let service = state.service.clone();
    let report = blocking(move || Ok(service.expressions().run(&request.latex))).await?;
    Ok(Json(ExpressionView::from(report)))
}

/// Render the plot of a LaTeX string as PNG
async fn handle_plot(
    State(state): State<AppState>,
    Json(request): Json<LatexRequest>,
) -> Result<Response, InkMathError> {
    let service = state.service.clone();
    let png = blocking(move || {
        let pipeline = service.expressions();
        let expr = pipeline
            .parse_symbolic(&request.latex)
            .map_err(SymbolicError::from)?;

        match pipeline.plot(&expr) {
            PlotOutcome::Plotted(series) => {
                plot::render_png(&series, pipeline.settings()).map(Some)
            }
            PlotOutcome::Skipped { .. } => Ok(None),
            PlotOutcome::Failed(e) => Err(e.into()),
        }
    })
    .await?;

    Ok(match png {
        Some(png) => ([(header::CONTENT_TYPE, "image/png")], png).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// Return a LaTeX string as a file download
async fn handle_download(Json(request): Json<LatexRequest>) -> Response {
    attachment(DownloadPayload::new(request.latex))
}

fn attachment(payload: DownloadPayload) -> Response {
    (
        [
            (header::CONTENT_TYPE, payload.mime_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", payload.file_name),
            ),
        ],
        payload.content,
    )
        .into_response()
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.service.registry();
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        recognizers: registry.info(),
        default_recognizer: registry.default_name().to_string(),
        max_file_size_bytes: state.config.max_file_size,
        border: state.service.preprocessor().border(),
        plot: state.service.expressions().settings().clone(),
    })
}
