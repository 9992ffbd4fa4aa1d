//! OCRS recognizer implementation
//!
//! Pure Rust OCR using the ocrs library. No system dependencies required.
//! Downloads neural network models automatically on first use. ocrs reads
//! printed Latin text, so each detected line becomes one candidate ranked by
//! how plausible it is as an inline math expression.

use crate::canvas::ProcessedImage;
use crate::config::Config;
use crate::error::InkMathError;
use crate::recognition::{RecognitionResult, Recognizer};
use ocrs::{DecodeMethod, ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Published ocrs models
const DETECTION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten";
const RECOGNITION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten";

pub struct OcrsRecognizer {
    engine: OcrEngine,
}

impl OcrsRecognizer {
    /// Load the models, downloading them into the cache directory if needed
    pub fn new(config: &Config) -> Result<Self, InkMathError> {
        let cache_dir = config.model_cache_dir.clone().unwrap_or_else(default_cache_dir);

        let detection_model_path =
            ensure_model_downloaded(&cache_dir, DETECTION_MODEL_URL, "text-detection.rten")?;
        let recognition_model_path =
            ensure_model_downloaded(&cache_dir, RECOGNITION_MODEL_URL, "text-recognition.rten")?;

        let detection_model = Model::load_file(&detection_model_path).map_err(|e| {
            InkMathError::Initialization(format!("Failed to load detection model: {}", e))
        })?;
        let recognition_model = Model::load_file(&recognition_model_path).map_err(|e| {
            InkMathError::Initialization(format!("Failed to load recognition model: {}", e))
        })?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            decode_method: DecodeMethod::Greedy,
            ..Default::default()
        })
        .map_err(|e| {
            InkMathError::Initialization(format!("Failed to create OCR engine: {}", e))
        })?;

        tracing::info!("ocrs recognizer initialized successfully");

        Ok(Self { engine })
    }

    fn recognize_lines(&self, image: &ProcessedImage) -> Result<Vec<String>, InkMathError> {
        let rgb = image.image();
        let img_source = ImageSource::from_bytes(rgb.as_raw(), rgb.dimensions()).map_err(|e| {
            InkMathError::Recognition(format!("Failed to create image source: {}", e))
        })?;

        let ocr_input = self
            .engine
            .prepare_input(img_source)
            .map_err(|e| InkMathError::Recognition(format!("Failed to prepare input: {}", e)))?;

        let word_rects = self
            .engine
            .detect_words(&ocr_input)
            .map_err(|e| InkMathError::Recognition(format!("Failed to detect words: {}", e)))?;

        let line_rects = self.engine.find_text_lines(&ocr_input, &word_rects);

        let line_texts = self
            .engine
            .recognize_text(&ocr_input, &line_rects)
            .map_err(|e| InkMathError::Recognition(format!("Failed to recognize text: {}", e)))?;

        Ok(line_texts
            .iter()
            .filter_map(|line| line.as_ref())
            .map(|line| {
                line.words()
                    .map(|word| word.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|text| !text.trim().is_empty())
            .collect())
    }
}

impl Recognizer for OcrsRecognizer {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn description(&self) -> &'static str {
        "Neural line OCR (ocrs), candidates ranked as math"
    }

    fn recognize(&self, image: &ProcessedImage) -> Result<RecognitionResult, InkMathError> {
        let lines = self.recognize_lines(image)?;
        Ok(rank_candidates(lines))
    }
}

/// One candidate per line, most math-like first
fn rank_candidates(lines: Vec<String>) -> RecognitionResult {
    let mut scored: Vec<(String, f32)> = lines
        .into_iter()
        .map(|line| {
            let confidence = calculate_confidence(&line);
            (line, confidence)
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    RecognitionResult::candidates(scored)
}

/// Characters that appear in inline math
fn is_math_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c.is_whitespace() || "+-*/=^_()[]{}|\\.,<>!'".contains(c)
}

/// Score how plausible a line is as an inline math expression.
///
/// ocrs does not expose per-character scores, so the recognized text itself
/// is inspected for patterns that indicate a usable expression.
fn calculate_confidence(text: &str) -> f32 {
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }

    let symbol_score = analyze_symbols(text);
    let bracket_score = analyze_brackets(text);
    let operator_score = repeated_operators(text);

    let confidence = 0.6 * symbol_score + 0.2 * bracket_score + 0.2 * operator_score;
    confidence.clamp(0.0, 1.0)
}

/// Share of characters that belong to the math alphabet
fn analyze_symbols(text: &str) -> f32 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    let valid = text.chars().filter(|c| is_math_char(*c)).count();
    valid as f32 / total as f32
}

/// 1.0 when brackets are balanced and properly nested
fn analyze_brackets(text: &str) -> f32 {
    let mut stack = Vec::new();
    for c in text.chars() {
        match c {
            '(' | '[' | '{' => stack.push(c),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if stack.pop() != Some(expected) {
                    return 0.3;
                }
            }
            _ => {}
        }
    }
    if stack.is_empty() {
        1.0
    } else {
        0.5
    }
}

/// Penalize runs of the same operator such as `++` or `==`.
///
/// Digits, letters and brackets may repeat freely (`100`, `xx`, `((`); a
/// doubled operator is almost always a misread stroke.
fn repeated_operators(text: &str) -> f32 {
    let longest = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .fold((None, 0usize, 0usize), |(prev, run, longest), c| {
            if c.is_alphanumeric() || "\\()[]{}".contains(c) {
                (None, 0, longest)
            } else if prev == Some(c) {
                (prev, run + 1, longest.max(run + 1))
            } else {
                (Some(c), 1, longest.max(1))
            }
        })
        .2;

    match longest {
        0 | 1 => 1.0,
        2 => 0.6,
        _ => 0.2,
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("inkmath")
}

/// Path of the cached model, fetched from `url` when missing
fn ensure_model_downloaded(
    cache_dir: &Path,
    url: &str,
    filename: &str,
) -> Result<PathBuf, InkMathError> {
    std::fs::create_dir_all(cache_dir).map_err(|e| {
        InkMathError::Initialization(format!("Failed to create cache directory: {}", e))
    })?;

    let model_path = cache_dir.join(filename);

    if !model_path.exists() {
        tracing::info!("Model {} not cached, downloading from {}", filename, url);
        download_file(url, &model_path)?;
        tracing::info!("Saved {} to {:?}", filename, model_path);
    } else {
        tracing::debug!("Model {} found at {:?}", filename, model_path);
    }

    Ok(model_path)
}

/// Fetch `url` into `path`
fn download_file(url: &str, path: &Path) -> Result<(), InkMathError> {
    let response = ureq::get(url).call().map_err(|e| {
        InkMathError::Initialization(format!("Failed to download model: {}", e))
    })?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        InkMathError::Initialization(format!("Failed to read response body: {}", e))
    })?;

    // write next to the target first so an interrupted download is never cached
    let partial = path.with_extension("part");
    let mut file = File::create(&partial).map_err(|e| {
        InkMathError::Initialization(format!("Failed to create model file: {}", e))
    })?;
    file.write_all(&buffer).map_err(|e| {
        InkMathError::Initialization(format!("Failed to write model file: {}", e))
    })?;
    std::fs::rename(&partial, path).map_err(|e| {
        InkMathError::Initialization(format!("Failed to move model file into place: {}", e))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_line_scores_zero() {
        assert_eq!(calculate_confidence(""), 0.0);
        assert_eq!(calculate_confidence("   "), 0.0);
    }

    #[test]
    fn test_clean_expression_high_confidence() {
        let confidence = calculate_confidence("x^2 + 2x + 1 = 0");
        assert!(confidence > 0.9, "got {}", confidence);
    }

    #[test]
    fn test_symbol_soup_scores_low() {
        let confidence = calculate_confidence("§±®©¥€£¢¤");
        assert!(confidence < 0.5, "got {}", confidence);
    }

    #[test]
    fn test_unbalanced_brackets_lower_confidence() {
        assert_eq!(analyze_brackets("(x+1)^{2}"), 1.0);
        assert_eq!(analyze_brackets("(x+1"), 0.5);
        assert_eq!(analyze_brackets("x+1)"), 0.3);
        assert!(calculate_confidence("(x+1]") < calculate_confidence("(x+1)"));
    }

    #[test]
    fn test_repeated_operators() {
        assert_eq!(repeated_operators("x + y"), 1.0);
        assert_eq!(repeated_operators("1000 xx"), 1.0);
        assert_eq!(repeated_operators("((x))"), 1.0);
        assert_eq!(repeated_operators("x ++ y"), 0.6);
        assert_eq!(repeated_operators("x === y"), 0.2);
    }

    #[test]
    fn test_candidates_are_ranked() {
        let result = rank_candidates(vec!["§§ ¥".to_string(), "a + b".to_string()]);
        assert_eq!(result.text(), Some("a + b".to_string()));
        assert_eq!(result.as_value().as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_no_lines_is_empty() {
        assert_eq!(rank_candidates(Vec::new()).text(), None);
    }
}
