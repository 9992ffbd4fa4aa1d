use crate::canvas::{CanvasImage, InkBox, ProcessedImage};
use crate::error::InkMathError;
use serde::Serialize;
use std::time::Instant;

use super::steps;

/// Width of the white border added around the ink, in pixels
pub const DEFAULT_BORDER: u32 = 20;

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_us: u64,
}

/// Result of preprocessing including timing stats
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessingResult {
    /// Processed image (not serialized)
    #[serde(skip)]
    pub image: ProcessedImage,
    pub width: u32,
    pub height: u32,
    /// Ink location on the source canvas
    pub ink_box: InkBox,
    pub border: u32,
    /// Total preprocessing time in microseconds
    pub total_time_us: u64,
    /// Individual step timings
    pub steps: Vec<StepTiming>,
}

/// Canvas preprocessing: composite, invert, find ink, crop and pad
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    border: u32,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(DEFAULT_BORDER)
    }
}

impl Preprocessor {
    pub fn new(border: u32) -> Self {
        Self { border }
    }

    pub fn border(&self) -> u32 {
        self.border
    }

    /// Process a canvas. Returns `Ok(None)` when nothing was drawn.
    pub fn process(
        &self,
        canvas: &CanvasImage,
    ) -> Result<Option<PreprocessingResult>, InkMathError> {
        let start = Instant::now();
        let mut steps_timing = Vec::new();

        let composite = self.run_step("composite", &mut steps_timing, || {
            Ok(steps::composite::apply(canvas.as_rgba()))
        })?;
        let ink = self.run_step("luminance", &mut steps_timing, || {
            Ok(steps::luminance::apply(&composite))
        })?;
        let ink_box = self.run_step("bbox", &mut steps_timing, || Ok(steps::bbox::apply(&ink)))?;

        let Some(ink_box) = ink_box else {
            tracing::debug!(
                "No ink on {}x{} canvas",
                canvas.width(),
                canvas.height()
            );
            return Ok(None);
        };

        let cropped = self.run_step("crop", &mut steps_timing, || {
            Ok(steps::crop::apply(&composite, ink_box))
        })?;
        let padded = self.run_step("pad", &mut steps_timing, || {
            steps::pad::apply(&cropped, self.border)
        })?;

        let result = PreprocessingResult {
            width: padded.width(),
            height: padded.height(),
            image: ProcessedImage::new(padded, ink_box),
            ink_box,
            border: self.border,
            total_time_us: start.elapsed().as_micros() as u64,
            steps: steps_timing,
        };
        tracing::debug!(
            "Preprocessed {}x{} canvas to {}x{} in {}us",
            canvas.width(),
            canvas.height(),
            result.width,
            result.height,
            result.total_time_us
        );
        Ok(Some(result))
    }

    fn run_step<T, F>(
        &self,
        name: &str,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<T, InkMathError>
    where
        F: FnOnce() -> Result<T, InkMathError>,
    {
        let step_start = Instant::now();
        let result = step_fn()?;
        timings.push(StepTiming {
            name: name.to_string(),
            time_us: step_start.elapsed().as_micros() as u64,
        });
        Ok(result)
    }
}

/// Preprocess with the default border
pub fn preprocess(canvas: &CanvasImage) -> Result<Option<ProcessedImage>, InkMathError> {
    Ok(Preprocessor::default()
        .process(canvas)?
        .map(|result| result.image))
}
