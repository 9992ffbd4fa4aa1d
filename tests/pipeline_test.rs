//! Library-level checks of the canvas to expression flow, with the recognizer
//! and the LaTeX parser swapped for stubs.

use image::{Rgba, RgbaImage};
use inkmath::pipeline::{PlotSettings, SamplePolicy};
use inkmath::preprocessing::Preprocessor;
use inkmath::recognizers::RecognizerRegistry;
use inkmath::symbolic::{
    EvaluationError, Expr, ParseError, SymbolicError, SymbolicExpression, SymbolicParser,
};
use inkmath::{
    extract_text, preprocess, CanvasImage, ExpressionPipeline, InkMathError, PlotOutcome,
    ProcessedImage, RecognitionOutcome, RecognitionResult, RecognitionService, Recognizer,
};
use serde_json::json;
use std::sync::Arc;

struct Stub(&'static str);

impl Recognizer for Stub {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn description(&self) -> &'static str {
        "fixed LaTeX"
    }

    fn recognize(&self, _image: &ProcessedImage) -> Result<RecognitionResult, InkMathError> {
        Ok(RecognitionResult::single(self.0))
    }
}

/// Ignores its input and always yields `t^2 = 9`
struct SquareParser;

impl SymbolicParser for SquareParser {
    fn parse(&self, latex: &str) -> Result<SymbolicExpression, ParseError> {
        if latex.is_empty() {
            return Err(ParseError::new("empty input", 0));
        }
        Ok(SymbolicExpression::Equation {
            lhs: Expr::pow(Expr::symbol("t"), Expr::int(2)),
            rhs: Expr::int(9),
        })
    }
}

fn canvas_with_stroke(x0: u32, y0: u32, x1: u32, y1: u32) -> CanvasImage {
    let mut pixels = RgbaImage::new(400, 200);
    for x in x0..x1 {
        for y in y0..y1 {
            pixels.put_pixel(x, y, Rgba([10, 10, 10, 255]));
        }
    }
    CanvasImage::from_rgba(pixels).unwrap()
}

fn service(latex: &'static str) -> RecognitionService {
    let registry = RecognizerRegistry::from_recognizers(vec![Arc::new(Stub(latex))]).unwrap();
    RecognitionService::new(
        Preprocessor::default(),
        Arc::new(registry),
        Arc::new(ExpressionPipeline::default()),
    )
}

#[test]
fn test_transparent_canvas_has_no_ink() {
    for (w, h) in [(1, 1), (7, 3), (300, 150)] {
        let canvas = CanvasImage::from_raw(w, h, vec![0; (w * h * 4) as usize]).unwrap();
        assert!(preprocess(&canvas).unwrap().is_none());
    }
}

#[test]
fn test_border_is_twenty_white_pixels() {
    for (x0, y0, x1, y1) in [(0, 0, 1, 1), (50, 60, 90, 61), (390, 190, 400, 200)] {
        let processed = preprocess(&canvas_with_stroke(x0, y0, x1, y1))
            .unwrap()
            .unwrap();
        let (bw, bh) = (x1 - x0, y1 - y0);
        assert_eq!((processed.width(), processed.height()), (bw + 40, bh + 40));

        let image = processed.image();
        for (x, y, pixel) in image.enumerate_pixels() {
            let inside = (20..20 + bw).contains(&x) && (20..20 + bh).contains(&y);
            if !inside {
                assert_eq!(pixel.0, [255, 255, 255], "border pixel ({}, {})", x, y);
            }
        }
        assert_eq!(image.get_pixel(20, 20).0, [10, 10, 10]);
    }
}

#[test]
fn test_reprocessing_offsets_ink_box_by_border() {
    let first = preprocess(&canvas_with_stroke(120, 40, 180, 70))
        .unwrap()
        .unwrap();
    let second = preprocess(&first.to_canvas().unwrap()).unwrap().unwrap();

    let original = first.ink_box();
    let again = second.ink_box();
    assert_eq!((original.x, original.y), (120, 40));
    assert_eq!((again.x, again.y), (20, 20));
    assert_eq!((again.width, again.height), (original.width, original.height));
    assert_eq!(second.image(), first.image());
}

#[test]
fn test_extract_text_shapes() {
    assert_eq!(extract_text(&json!([])), None);
    assert_eq!(extract_text(&json!({"confidence": 0.4})), None);
    assert_eq!(extract_text(&json!(true)), None);
    assert_eq!(
        extract_text(&json!([{"text": "x+1"}, {"text": "x+l"}])),
        Some("x+1".to_string())
    );
}

#[test]
fn test_square_scenario_end_to_end() {
    let outcome = service("x^2+2x+1")
        .recognize(&canvas_with_stroke(100, 80, 160, 90), None)
        .unwrap();
    let RecognitionOutcome::Recognized { latex, report, .. } = outcome else {
        panic!("expected a recognized expression");
    };

    assert_eq!(latex, "x^2+2x+1");
    assert_eq!(report.rendered.latex, "x^2+2x+1");
    assert_eq!(report.symbolic.unwrap().free_variables, vec!["x"]);
    assert_eq!(report.simplified.unwrap().text, "(x + 1)^2");

    let PlotOutcome::Plotted(series) = report.plot else {
        panic!("expected a plot");
    };
    assert_eq!(series.points.len(), 400);
    assert_eq!(series.points[0].x, -10.0);
    assert_eq!(series.points[399].x, 10.0);
    let lowest = series
        .defined_points()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .unwrap();
    assert!((lowest.0 + 1.0).abs() < 0.05);
}

#[test]
fn test_stage_failures_are_isolated() {
    let report = ExpressionPipeline::default().run("\\frac{x}{");
    assert_eq!(report.rendered.latex, "\\frac{x}{");
    assert!(report.symbolic.is_err());
    assert!(matches!(report.simplified, Err(SymbolicError::Parse(_))));
    assert!(matches!(report.plot, PlotOutcome::Failed(SymbolicError::Parse(_))));

    let report = ExpressionPipeline::default().run("\\frac{1}{0}");
    assert!(report.symbolic.is_ok());
    assert!(matches!(
        report.simplified,
        Err(SymbolicError::Evaluation(EvaluationError::DivisionByZero))
    ));
    assert!(matches!(
        report.plot,
        PlotOutcome::Failed(SymbolicError::Evaluation(EvaluationError::DivisionByZero))
    ));
}

#[test]
fn test_deep_fraction_chain_fails_at_parse() {
    let latex = format!("{}x{}", "\\frac{1}{".repeat(2_000), "}".repeat(2_000));
    let report = ExpressionPipeline::default().run(&latex);
    let Err(err) = report.symbolic else {
        panic!("expected a parse error");
    };
    assert!(err.message.contains("nested too deeply"));
    assert!(matches!(report.plot, PlotOutcome::Failed(SymbolicError::Parse(_))));
}

#[test]
fn test_plot_skips_without_single_variable() {
    let pipeline = ExpressionPipeline::default();
    for latex in ["x + y", "5"] {
        let expr = pipeline.parse_symbolic(latex).unwrap();
        assert!(matches!(pipeline.plot(&expr), PlotOutcome::Skipped { .. }));
    }
}

#[test]
fn test_singular_sample_policy() {
    let settings = PlotSettings {
        samples: 3,
        x_min: -1.0,
        x_max: 1.0,
        ..PlotSettings::default()
    };
    let lenient = ExpressionPipeline::with_settings(settings.clone());
    let expr = lenient.parse_symbolic("\\frac{1}{x}").unwrap();
    let PlotOutcome::Plotted(series) = lenient.plot(&expr) else {
        panic!("expected a plot");
    };
    assert_eq!(series.skipped(), 1);
    assert_eq!(series.points[1].y, None);
    assert_eq!(series.points[2].y, Some(1.0));

    let strict = ExpressionPipeline::with_settings(PlotSettings {
        policy: SamplePolicy::Abort,
        ..settings
    });
    assert!(matches!(
        strict.plot(&expr),
        PlotOutcome::Failed(SymbolicError::Evaluation(EvaluationError::AtSample { .. }))
    ));
}

#[test]
fn test_injected_parser() {
    let pipeline = ExpressionPipeline::new(Arc::new(SquareParser), PlotSettings::default());
    let report = pipeline.run("anything");

    let symbolic = report.symbolic.unwrap();
    assert!(symbolic.is_equation);
    assert_eq!(symbolic.free_variables, vec!["t"]);

    let PlotOutcome::Plotted(series) = report.plot else {
        panic!("expected a plot");
    };
    assert_eq!(series.variable, "t");
    let root = series
        .defined_points()
        .filter(|(x, _)| *x > 0.0)
        .min_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
        .unwrap();
    assert!((root.0 - 3.0).abs() < 0.05);

    assert!(pipeline.run("").symbolic.is_err());
}
