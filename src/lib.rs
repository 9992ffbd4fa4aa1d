//! Handwritten math recognition.
//!
//! A drawing goes through [`preprocessing`] (crop and pad the ink), a
//! [`recognition::Recognizer`] (bitmap to LaTeX) and the [`pipeline`]
//! (render, simplify, plot). [`server`] exposes the chain over HTTP.

pub mod canvas;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod preprocessing;
pub mod recognition;
pub mod recognizers;
pub mod server;
pub mod service;
pub mod symbolic;

pub use canvas::{CanvasImage, InkBox, ProcessedImage};
pub use error::InkMathError;
pub use pipeline::{ExpressionPipeline, ExpressionReport, PlotOutcome};
pub use preprocessing::{preprocess, Preprocessor};
pub use recognition::{extract_text, RecognitionResult, Recognizer};
pub use service::{RecognitionOutcome, RecognitionService};
