//! Canvas-to-expression service.
//!
//! Holds the collaborators that are built once per process (preprocessor,
//! recognizer registry, expression pipeline) and chains them for one drawing.

use crate::canvas::CanvasImage;
use crate::error::InkMathError;
use crate::pipeline::{ExpressionPipeline, ExpressionReport};
use crate::preprocessing::{PreprocessingResult, Preprocessor};
use crate::recognition::RecognitionResult;
use crate::recognizers::RecognizerRegistry;
use serde::Serialize;
use std::sync::Arc;

pub const DOWNLOAD_FILE_NAME: &str = "math_output.tex";
pub const DOWNLOAD_MIME_TYPE: &str = "text/plain";

/// The raw LaTeX offered for download
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadPayload {
    pub file_name: &'static str,
    pub mime_type: &'static str,
    pub content: String,
}

impl DownloadPayload {
    pub fn new(latex: impl Into<String>) -> Self {
        Self {
            file_name: DOWNLOAD_FILE_NAME,
            mime_type: DOWNLOAD_MIME_TYPE,
            content: latex.into(),
        }
    }
}

#[derive(Debug)]
pub enum RecognitionOutcome {
    /// The canvas is blank
    NoInk,
    /// The recognizer returned nothing usable
    NoExpression {
        preprocessing: PreprocessingResult,
        recognizer: String,
        raw_output: RecognitionResult,
    },
    Recognized {
        preprocessing: PreprocessingResult,
        recognizer: String,
        latex: String,
        report: ExpressionReport,
        download: DownloadPayload,
    },
}

pub struct RecognitionService {
    preprocessor: Preprocessor,
    registry: Arc<RecognizerRegistry>,
    expressions: Arc<ExpressionPipeline>,
}

impl RecognitionService {
    pub fn new(
        preprocessor: Preprocessor,
        registry: Arc<RecognizerRegistry>,
        expressions: Arc<ExpressionPipeline>,
    ) -> Self {
        Self {
            preprocessor,
            registry,
            expressions,
        }
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn registry(&self) -> &RecognizerRegistry {
        &self.registry
    }

    pub fn expressions(&self) -> &ExpressionPipeline {
        &self.expressions
    }

    /// Preprocess the canvas, recognize it and run the expression pipeline.
    /// `recognizer` selects a registered recognizer by name.
    pub fn recognize(
        &self,
        canvas: &CanvasImage,
        recognizer: Option<&str>,
    ) -> Result<RecognitionOutcome, InkMathError> {
        let recognizer = self.registry.select(recognizer)?;

        let Some(preprocessing) = self.preprocessor.process(canvas)? else {
            return Ok(RecognitionOutcome::NoInk);
        };

        let raw_output = recognizer.recognize(&preprocessing.image)?;
        let Some(latex) = raw_output.text() else {
            tracing::info!("{} found no expression", recognizer.name());
            return Ok(RecognitionOutcome::NoExpression {
                preprocessing,
                recognizer: recognizer.name().to_string(),
                raw_output,
            });
        };
        tracing::info!("{} recognized {:?}", recognizer.name(), latex);

        let report = self.expressions.run(&latex);
        Ok(RecognitionOutcome::Recognized {
            preprocessing,
            recognizer: recognizer.name().to_string(),
            download: DownloadPayload::new(latex.clone()),
            latex,
            report,
        })
    }

    /// Recognize a canvas down to its raw LaTeX, treating a blank canvas and
    /// an empty recognition as errors
    pub fn recognize_latex(
        &self,
        canvas: &CanvasImage,
        recognizer: Option<&str>,
    ) -> Result<String, InkMathError> {
        let recognizer = self.registry.select(recognizer)?;
        let preprocessing = self
            .preprocessor
            .process(canvas)?
            .ok_or(InkMathError::NoInkDetected)?;
        recognizer
            .recognize(&preprocessing.image)?
            .text()
            .ok_or(InkMathError::NoExpressionDetected)
    }
}
