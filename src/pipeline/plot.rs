//! Sampling a single-variable function and rasterizing the result.

use crate::canvas::encode_png;
use crate::error::InkMathError;
use crate::symbolic::{CompiledFunction, EvaluationError};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use serde::Serialize;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([160, 160, 160]);
const FRAME: Rgb<u8> = Rgb([64, 64, 64]);
const CURVE: Rgb<u8> = Rgb([31, 119, 180]);

/// Margin around the plot area, in pixels
const MARGIN: f32 = 10.0;

/// What to do with a sample that cannot be evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplePolicy {
    /// Leave a gap in the series and keep going
    #[default]
    Skip,
    /// Fail the whole plot
    Abort,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotSettings {
    pub samples: usize,
    pub x_min: f64,
    pub x_max: f64,
    pub width: u32,
    pub height: u32,
    pub policy: SamplePolicy,
}

impl Default for PlotSettings {
    fn default() -> Self {
        Self {
            samples: 400,
            x_min: -10.0,
            x_max: 10.0,
            width: 640,
            height: 480,
            policy: SamplePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlotPoint {
    pub x: f64,
    /// `None` where the function is undefined
    pub y: Option<f64>,
}

/// Samples of a function of one free variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotSeries {
    pub variable: String,
    pub points: Vec<PlotPoint>,
}

impl PlotSeries {
    /// Number of samples that could not be evaluated
    pub fn skipped(&self) -> usize {
        self.points.iter().filter(|p| p.y.is_none()).count()
    }

    pub fn defined_points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.points.iter().filter_map(|p| p.y.map(|y| (p.x, y)))
    }

    /// Smallest and largest defined value
    pub fn y_range(&self) -> Option<(f64, f64)> {
        self.defined_points().fold(None, |range, (_, y)| match range {
            None => Some((y, y)),
            Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
        })
    }
}

/// `n` evenly spaced values from `min` to `max` inclusive
pub fn linspace(min: f64, max: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let step = (max - min) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { max } else { min + step * i as f64 })
                .collect()
        }
    }
}

/// Evaluate `function` over the configured domain
pub fn sample(
    function: &CompiledFunction,
    variable: &str,
    settings: &PlotSettings,
) -> Result<PlotSeries, EvaluationError> {
    let mut points = Vec::with_capacity(settings.samples);
    for x in linspace(settings.x_min, settings.x_max, settings.samples) {
        let y = match function.call(x) {
            Ok(y) => Some(y),
            Err(e) if settings.policy == SamplePolicy::Skip => {
                tracing::trace!("skipping sample at {}: {}", x, e);
                None
            }
            Err(e) => {
                return Err(EvaluationError::AtSample {
                    x,
                    source: Box::new(e),
                })
            }
        };
        points.push(PlotPoint { x, y });
    }

    let series = PlotSeries {
        variable: variable.to_string(),
        points,
    };
    if series.y_range().is_none() {
        return Err(EvaluationError::NoFiniteSamples {
            min: settings.x_min,
            max: settings.x_max,
        });
    }
    Ok(series)
}

/// Draw the series as a polyline with axes, broken wherever a sample is missing
pub fn rasterize(series: &PlotSeries, settings: &PlotSettings) -> RgbImage {
    let (width, height) = (settings.width.max(2), settings.height.max(2));
    let mut image = RgbImage::from_pixel(width, height, BACKGROUND);

    let (mut y_min, mut y_max) = series.y_range().unwrap_or((-1.0, 1.0));
    if y_max - y_min < f64::EPSILON {
        y_min -= 1.0;
        y_max += 1.0;
    }
    let pad = (y_max - y_min) * 0.05;
    let (y_min, y_max) = (y_min - pad, y_max + pad);
    let (x_min, x_max) = (settings.x_min, settings.x_max);

    let plot_w = width as f32 - 2.0 * MARGIN;
    let plot_h = height as f32 - 2.0 * MARGIN;
    let to_px = |x: f64, y: f64| -> (f32, f32) {
        let px = MARGIN + ((x - x_min) / (x_max - x_min)) as f32 * plot_w;
        let py = MARGIN + ((y_max - y) / (y_max - y_min)) as f32 * plot_h;
        (px, py)
    };

    if y_min <= 0.0 && 0.0 <= y_max {
        draw_line_segment_mut(&mut image, to_px(x_min, 0.0), to_px(x_max, 0.0), AXIS);
    }
    if x_min <= 0.0 && 0.0 <= x_max {
        draw_line_segment_mut(&mut image, to_px(0.0, y_min), to_px(0.0, y_max), AXIS);
    }
    draw_hollow_rect_mut(&mut image, Rect::at(0, 0).of_size(width, height), FRAME);

    for pair in series.points.windows(2) {
        if let (Some(y0), Some(y1)) = (pair[0].y, pair[1].y) {
            draw_line_segment_mut(
                &mut image,
                to_px(pair[0].x, y0),
                to_px(pair[1].x, y1),
                CURVE,
            );
        }
    }
    image
}

/// Rasterize and PNG-encode a series
pub fn render_png(series: &PlotSeries, settings: &PlotSettings) -> Result<Vec<u8>, InkMathError> {
    encode_png(&rasterize(series, settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::Expr;

    fn compiled(expr: Expr) -> CompiledFunction {
        CompiledFunction::new(&expr, "x").unwrap()
    }

    fn x() -> Expr {
        Expr::symbol("x")
    }

    #[test]
    fn test_linspace_is_inclusive() {
        let xs = linspace(-10.0, 10.0, 400);
        assert_eq!(xs.len(), 400);
        assert_eq!(xs[0], -10.0);
        assert_eq!(xs[399], 10.0);
        assert!((xs[1] - xs[0] - 20.0 / 399.0).abs() < 1e-12);
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(3.0, 5.0, 1), vec![3.0]);
    }

    #[test]
    fn test_sample_parabola() {
        let f = compiled(Expr::pow(x(), Expr::int(2)));
        let series = sample(&f, "x", &PlotSettings::default()).unwrap();
        assert_eq!(series.points.len(), 400);
        assert_eq!(series.skipped(), 0);
        assert_eq!(series.points[0].y, Some(100.0));
        let (lo, hi) = series.y_range().unwrap();
        assert!(lo >= 0.0 && lo < 0.01);
        assert_eq!(hi, 100.0);
    }

    #[test]
    fn test_singularity_is_skipped() {
        let f = compiled(Expr::div(Expr::int(1), x()));
        let settings = PlotSettings {
            samples: 5,
            x_min: -2.0,
            x_max: 2.0,
            ..PlotSettings::default()
        };
        let series = sample(&f, "x", &settings).unwrap();
        assert_eq!(series.skipped(), 1);
        assert_eq!(series.points[2], PlotPoint { x: 0.0, y: None });
        assert_eq!(series.points[4].y, Some(0.5));
    }

    #[test]
    fn test_singularity_aborts_in_strict_mode() {
        let f = compiled(Expr::div(Expr::int(1), x()));
        let settings = PlotSettings {
            samples: 5,
            x_min: -2.0,
            x_max: 2.0,
            policy: SamplePolicy::Abort,
            ..PlotSettings::default()
        };
        match sample(&f, "x", &settings) {
            Err(EvaluationError::AtSample { x, source }) => {
                assert_eq!(x, 0.0);
                assert_eq!(*source, EvaluationError::DivisionByZero);
            }
            other => panic!("expected AtSample, got {:?}", other),
        }
    }

    #[test]
    fn test_nowhere_defined_is_an_error() {
        // sqrt(-1 - x^2) has no real value anywhere
        let inner = Expr::Add(vec![Expr::int(-1), Expr::neg(Expr::pow(x(), Expr::int(2)))]);
        let f = compiled(Expr::pow(
            inner,
            Expr::Number(crate::symbolic::Rational::new(1, 2).unwrap()),
        ));
        assert!(matches!(
            sample(&f, "x", &PlotSettings::default()),
            Err(EvaluationError::NoFiniteSamples { .. })
        ));
    }

    #[test]
    fn test_rasterize_draws_curve_and_axes() {
        let f = compiled(x());
        let settings = PlotSettings {
            width: 100,
            height: 80,
            ..PlotSettings::default()
        };
        let series = sample(&f, "x", &settings).unwrap();
        let image = rasterize(&series, &settings);
        assert_eq!(image.dimensions(), (100, 80));
        assert!(image.pixels().any(|p| *p == CURVE));
        assert!(image.pixels().any(|p| *p == AXIS));
        assert_eq!(image.get_pixel(0, 0), &FRAME);
    }

    #[test]
    fn test_render_png() {
        let series = PlotSeries {
            variable: "t".to_string(),
            points: vec![PlotPoint { x: 0.0, y: Some(1.0) }, PlotPoint { x: 1.0, y: Some(1.0) }],
        };
        let png = render_png(&series, &PlotSettings::default()).unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }
}
