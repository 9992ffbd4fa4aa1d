//! Canvas preprocessing for recognition
//!
//! Turns a raw RGBA drawing into a tightly cropped RGB image with a uniform
//! white border, timing each step.

pub mod pipeline;
pub mod steps;

pub use pipeline::{preprocess, PreprocessingResult, Preprocessor, StepTiming, DEFAULT_BORDER};
