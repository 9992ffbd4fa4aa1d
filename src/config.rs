use crate::error::InkMathError;
use crate::pipeline::plot::{PlotSettings, SamplePolicy};
use crate::preprocessing::DEFAULT_BORDER;
use crate::recognizers::RecognizerKind;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "inkmath-server")]
#[command(about = "Handwritten math recognition server: canvas to LaTeX, simplification and plots")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "INKMATH_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "INKMATH_PORT", default_value = "9393")]
    pub port: u16,

    /// Maximum upload size in bytes (default: 10MB)
    #[arg(long, env = "INKMATH_MAX_FILE_SIZE", default_value = "10485760")]
    pub max_file_size: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Recognizers to initialize, the first one is the default
    #[arg(
        long,
        env = "INKMATH_RECOGNIZERS",
        value_enum,
        value_delimiter = ',',
        default_value = "ocrs"
    )]
    pub recognizers: Vec<RecognizerKind>,

    /// Program run by the `command` recognizer; it receives the PNG path as
    /// its last argument and prints LaTeX or JSON to stdout
    #[arg(long, env = "INKMATH_RECOGNIZER_PROGRAM")]
    pub recognizer_program: Option<String>,

    /// Extra argument passed to the recognizer program before the image path
    #[arg(long = "recognizer-arg", allow_hyphen_values = true)]
    pub recognizer_args: Vec<String>,

    /// Where downloaded recognition models are cached
    #[arg(long, env = "INKMATH_MODEL_CACHE_DIR")]
    pub model_cache_dir: Option<PathBuf>,

    /// White border added around the cropped ink, in pixels
    #[arg(long, env = "INKMATH_BORDER", default_value_t = DEFAULT_BORDER)]
    pub border: u32,

    /// Number of evenly spaced plot samples
    #[arg(long, default_value_t = 400)]
    pub plot_samples: usize,

    /// Lower end of the plotted domain
    #[arg(long, default_value_t = -10.0, allow_hyphen_values = true)]
    pub plot_min: f64,

    /// Upper end of the plotted domain
    #[arg(long, default_value_t = 10.0, allow_hyphen_values = true)]
    pub plot_max: f64,

    /// Plot raster width in pixels
    #[arg(long, default_value_t = 640)]
    pub plot_width: u32,

    /// Plot raster height in pixels
    #[arg(long, default_value_t = 480)]
    pub plot_height: u32,

    /// Abort a plot on the first sample that cannot be evaluated
    #[arg(long)]
    pub strict_plot: bool,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    pub recognizers: Vec<RecognizerKind>,
    pub recognizer_program: Option<String>,
    pub recognizer_args: Vec<String>,
    pub model_cache_dir: Option<PathBuf>,
    pub border: u32,
    pub plot: PlotSettings,
}

impl TryFrom<Args> for Config {
    type Error = InkMathError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        if args.recognizers.is_empty() {
            return Err(InkMathError::Configuration(
                "at least one recognizer is required".to_string(),
            ));
        }
        if args.recognizers.contains(&RecognizerKind::Command) && args.recognizer_program.is_none()
        {
            return Err(InkMathError::Configuration(
                "the command recognizer needs --recognizer-program".to_string(),
            ));
        }
        if args.plot_samples < 2 {
            return Err(InkMathError::Configuration(format!(
                "--plot-samples must be at least 2, got {}",
                args.plot_samples
            )));
        }
        if !(args.plot_min.is_finite() && args.plot_max.is_finite() && args.plot_min < args.plot_max)
        {
            return Err(InkMathError::Configuration(format!(
                "invalid plot domain [{}, {}]",
                args.plot_min, args.plot_max
            )));
        }
        if args.plot_width < 2 || args.plot_height < 2 {
            return Err(InkMathError::Configuration(format!(
                "plot raster {}x{} is too small",
                args.plot_width, args.plot_height
            )));
        }

        Ok(Self {
            host: args.host,
            port: args.port,
            max_file_size: args.max_file_size,
            recognizers: args.recognizers,
            recognizer_program: args.recognizer_program,
            recognizer_args: args.recognizer_args,
            model_cache_dir: args.model_cache_dir,
            border: args.border,
            plot: PlotSettings {
                samples: args.plot_samples,
                x_min: args.plot_min,
                x_max: args.plot_max,
                width: args.plot_width,
                height: args.plot_height,
                policy: if args.strict_plot {
                    SamplePolicy::Abort
                } else {
                    SamplePolicy::Skip
                },
            },
        })
    }
}
