use crate::symbolic::SymbolicError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InkMathError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("No ink detected on the canvas")]
    NoInkDetected,

    #[error("No expression detected")]
    NoExpressionDetected,

    #[error("Recognition failed: {0}")]
    Recognition(String),

    #[error("Unknown recognizer: {0}")]
    UnknownRecognizer(String),

    #[error("Failed to initialize recognizer: {0}")]
    Initialization(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Preprocessing failed: {0}")]
    Preprocessing(String),

    #[error(transparent)]
    Symbolic(#[from] SymbolicError),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Missing canvas in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl InkMathError {
    /// Status code and stable error code reported to clients
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            InkMathError::InvalidImage(_) => (StatusCode::BAD_REQUEST, "INVALID_IMAGE"),
            InkMathError::NoInkDetected => (StatusCode::UNPROCESSABLE_ENTITY, "NO_INK"),
            InkMathError::NoExpressionDetected => {
                (StatusCode::UNPROCESSABLE_ENTITY, "NO_EXPRESSION")
            }
            InkMathError::Recognition(_) => (StatusCode::INTERNAL_SERVER_ERROR, "RECOGNITION_ERROR"),
            InkMathError::UnknownRecognizer(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_RECOGNIZER"),
            InkMathError::Initialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INIT_ERROR"),
            InkMathError::Configuration(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            InkMathError::Preprocessing(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PREPROCESSING_ERROR")
            }
            InkMathError::Symbolic(SymbolicError::Parse(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "PARSE_ERROR")
            }
            InkMathError::Symbolic(SymbolicError::Evaluation(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "EVALUATION_ERROR")
            }
            InkMathError::ImageTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE"),
            InkMathError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            InkMathError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            InkMathError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for InkMathError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::{EvaluationError, ParseError};

    #[test]
    fn test_client_errors() {
        assert_eq!(
            InkMathError::MissingFile.status(),
            (StatusCode::BAD_REQUEST, "MISSING_FILE")
        );
        assert_eq!(
            InkMathError::ImageTooLarge { size: 2, max: 1 }.status().0,
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_symbolic_errors_are_unprocessable() {
        let parse = InkMathError::from(SymbolicError::from(ParseError::new("unexpected '}'", 3)));
        assert_eq!(parse.status(), (StatusCode::UNPROCESSABLE_ENTITY, "PARSE_ERROR"));
        assert_eq!(parse.to_string(), "Invalid LaTeX: unexpected '}' at position 3");

        let eval = InkMathError::from(SymbolicError::from(EvaluationError::DivisionByZero));
        assert_eq!(eval.status().1, "EVALUATION_ERROR");
    }

    #[test]
    fn test_response_status() {
        let response = InkMathError::NoInkDetected.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
