//! Diagnostic logging for poolctl.
//!
//! Logs always go to stderr so they never interleave with tables on stdout.
//!
//! # Environment Variables
//!
//! - `POOLCTL_LOG` - Log filter (overrides RUST_LOG)
//! - `POOLCTL_LOG_FORMAT` - Output format: pretty, compact, json
//! - `POOLCTL_LOG_FILE` - Path to a log file (in addition to stderr)
//! - `RUST_LOG` - Standard Rust log filter (fallback)
//!
//! `-v`/`-vv`/`-q` on the command line take precedence over the filter
//! variables.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::cli::Verbosity;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-field human-readable format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for log aggregation systems
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "full" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(format!(
                "Unknown log format: '{}'. Valid options: pretty, compact, json",
                s
            )),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base log level (default: WARN)
    pub level: Level,
    /// Log format (default: Pretty)
    pub format: LogFormat,
    /// Extra log file (None = stderr only)
    pub file_path: Option<PathBuf>,
    /// Custom filter string (overrides level if set)
    pub filter: Option<String>,
    /// Show target module in logs (default: false)
    pub show_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            format: LogFormat::Pretty,
            file_path: None,
            filter: None,
            show_target: false,
        }
    }
}

impl LogConfig {
    /// Configuration for the requested CLI verbosity.
    ///
    /// Anything other than the default pins the filter so env vars cannot
    /// override an explicit `-v` or `-q`.
    pub fn for_verbosity(verbosity: Verbosity) -> Self {
        let level = match verbosity {
            Verbosity::Quiet => Level::ERROR,
            Verbosity::Normal => Level::WARN,
            Verbosity::Info => Level::INFO,
            Verbosity::Debug => Level::DEBUG,
        };
        let filter = (verbosity != Verbosity::Normal).then(|| level_directive(level));
        Self {
            level,
            filter,
            show_target: verbosity >= Verbosity::Debug,
            ..Self::default()
        }
    }

    /// Apply environment variable overrides.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if self.filter.is_none() {
            self.filter = var("POOLCTL_LOG").or_else(|| var("RUST_LOG"));
        }

        if let Some(format) = var("POOLCTL_LOG_FORMAT")
            && let Ok(f) = format.parse()
        {
            self.format = f;
        }

        if let Some(path) = var("POOLCTL_LOG_FILE") {
            self.file_path = Some(PathBuf::from(path));
        }

        self
    }

    /// Build the EnvFilter for this configuration.
    fn build_filter(&self) -> EnvFilter {
        let fallback = || EnvFilter::new(level_directive(self.level));
        match self.filter {
            Some(ref filter) => EnvFilter::try_new(filter).unwrap_or_else(|_| {
                eprintln!("Warning: Invalid log filter '{}', using default", filter);
                fallback()
            }),
            None => fallback(),
        }
    }
}

fn level_directive(level: Level) -> String {
    level.to_string().to_lowercase()
}

fn boxed_layer<W>(format: LogFormat, writer: W, ansi: bool, show_target: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(show_target);
    match format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Pretty => layer.boxed(),
    }
}

/// Initialize the global tracing subscriber.
///
/// Call once at startup; later calls are silently ignored. A log file that
/// cannot be opened is reported on stderr and skipped.
pub fn init(config: LogConfig) {
    let filter = config.build_filter();

    let mut layers = vec![boxed_layer(
        config.format,
        std::io::stderr,
        crate::theme::colors_enabled(),
        config.show_target,
    )];

    if let Some(ref path) = config.file_path {
        let parent = path.parent().unwrap_or(std::path::Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("poolctl.log");
        match tracing_appender::rolling::RollingFileAppender::builder()
            .filename_prefix(file_name)
            .build(parent)
        {
            Ok(appender) => layers.push(boxed_layer(config.format, appender, false, true)),
            Err(e) => eprintln!("Warning: cannot open log file {}: {}", path.display(), e),
        }
    }

    let _ = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init();
}
