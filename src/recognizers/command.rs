//! External-program recognizer
//!
//! Writes the processed drawing to a temporary PNG and runs a LaTeX-OCR
//! program on it. The program's stdout is either plain LaTeX or JSON in the
//! recognition result shape (`{"text": ..}` or a list of those).

use crate::canvas::ProcessedImage;
use crate::config::Config;
use crate::error::InkMathError;
use crate::recognition::{RecognitionResult, Recognizer};
use std::io::Write;
use std::process::Command;

pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
}

impl CommandRecognizer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, InkMathError> {
        let program = config.recognizer_program.clone().ok_or_else(|| {
            InkMathError::Initialization("command recognizer needs a program".to_string())
        })?;
        tracing::info!("Command recognizer will run {} {:?}", program, config.recognizer_args);
        Ok(Self::new(program, config.recognizer_args.clone()))
    }
}

impl Recognizer for CommandRecognizer {
    fn name(&self) -> &'static str {
        "command"
    }

    fn description(&self) -> &'static str {
        "External LaTeX-OCR program reading a PNG path and printing LaTeX or JSON"
    }

    fn recognize(&self, image: &ProcessedImage) -> Result<RecognitionResult, InkMathError> {
        let png = image.to_png()?;

        let mut temp_file = tempfile::Builder::new()
            .prefix("inkmath-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| InkMathError::Internal(format!("Failed to create temp file: {}", e)))?;
        temp_file
            .write_all(&png)
            .map_err(|e| InkMathError::Internal(format!("Failed to write temp file: {}", e)))?;

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(temp_file.path())
            .output()
            .map_err(|e| {
                InkMathError::Recognition(format!("Failed to run {}: {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InkMathError::Recognition(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        tracing::debug!("{} printed {} bytes", self.program, stdout.len());
        parse_output(&stdout)
    }
}

fn parse_output(stdout: &str) -> Result<RecognitionResult, InkMathError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(RecognitionResult::empty());
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(|e| {
            InkMathError::Recognition(format!("Recognizer printed invalid JSON: {}", e))
        });
    }
    Ok(RecognitionResult::single(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_output() {
        let result = parse_output("x^2+2x+1\n").unwrap();
        assert_eq!(result.text(), Some("x^2+2x+1".to_string()));
    }

    #[test]
    fn test_json_output() {
        let result = parse_output(r#"[{"text": "\\sqrt{x}", "score": 0.8}]"#).unwrap();
        assert_eq!(result.text(), Some("\\sqrt{x}".to_string()));
        assert!(parse_output("{not json").is_err());
    }

    #[test]
    fn test_empty_output() {
        assert_eq!(parse_output("  \n").unwrap(), RecognitionResult::empty());
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use crate::canvas::CanvasImage;
        use crate::preprocessing::preprocess;
        use image::{Rgba, RgbaImage};

        fn drawing() -> ProcessedImage {
            let mut pixels = RgbaImage::new(40, 30);
            pixels.put_pixel(10, 10, Rgba([0, 0, 0, 255]));
            preprocess(&CanvasImage::from_rgba(pixels).unwrap())
                .unwrap()
                .unwrap()
        }

        fn shell(script: &str) -> CommandRecognizer {
            CommandRecognizer::new(
                "sh",
                vec!["-c".to_string(), script.to_string(), "sh".to_string()],
            )
        }

        #[test]
        fn test_program_receives_png_path() {
            // prints the PNG signature bytes 2..4 of the file it was given
            let recognizer = shell("head -c 4 \"$1\" | tail -c 3");
            let result = recognizer.recognize(&drawing()).unwrap();
            assert_eq!(result.text(), Some("PNG".to_string()));
        }

        #[test]
        fn test_failing_program_is_a_recognition_error() {
            let recognizer = shell("echo broken >&2; exit 3");
            let err = recognizer.recognize(&drawing()).unwrap_err();
            match err {
                InkMathError::Recognition(message) => assert!(message.contains("broken")),
                other => panic!("unexpected error: {:?}", other),
            }
        }

        #[test]
        fn test_missing_program() {
            let recognizer = CommandRecognizer::new("/nonexistent/inkmath-ocr", Vec::new());
            assert!(matches!(
                recognizer.recognize(&drawing()),
                Err(InkMathError::Recognition(_))
            ));
        }
    }
}
