use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Per-crate filter directives (e.g. `tcumux_frame=trace,tcumux_demux=debug`).
/// Takes precedence over `--log-level` when set and valid.
pub const LOG_FILTER_ENV: &str = "TCUMUX_LOG";

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn build_filter(level: LogLevel, directives: Option<&str>) -> EnvFilter {
    directives
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(level.directive()))
}

/// Install the stderr subscriber.
///
/// Event targets name the layer (`tcumux_transport`, `tcumux_frame`,
/// `tcumux_demux`) and are shown whenever filtering goes below `info` or is
/// per-crate.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let directives = std::env::var(LOG_FILTER_ENV).ok();
    let show_targets = directives.is_some() || level >= LogLevel::Debug;

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(build_filter(level, directives.as_deref()))
        .with_ansi(false)
        .with_target(show_targets);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}
