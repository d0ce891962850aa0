//! Tracing setup for the server binary.
//!
//! | Variable     | Meaning                                              |
//! |--------------|------------------------------------------------------|
//! | `LOG_FORMAT` | `json` or `text` (default `text`)                    |
//! | `LOG_FILE`   | write to a daily-rotated file instead of stdout      |
//! | `LOG_ANSI`   | force ANSI colors on or off                          |
//! | `RUST_LOG`   | env filter, defaults to [`DEFAULT_FILTER`]           |
//!
//! Pipeline logs carry case ids and stage names only. Media bytes and
//! patient context never reach a log line.

use std::path::{Path, PathBuf};

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str =
    "orthox_api=debug,orthox_pipeline=debug,orthox_inference=info,orthox_db=info,tower_http=debug";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Logging options read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub format: LogFormat,
    pub file: Option<PathBuf>,
    pub ansi: Option<bool>,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::parse(
            std::env::var("LOG_FORMAT").ok().as_deref(),
            std::env::var("LOG_FILE").ok().as_deref(),
            std::env::var("LOG_ANSI").ok().as_deref(),
        )
    }

    fn parse(format: Option<&str>, file: Option<&str>, ansi: Option<&str>) -> Self {
        let format = match format.map(|f| f.trim().to_ascii_lowercase()) {
            Some(f) if f == "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };
        Self {
            format,
            file: file.filter(|f| !f.trim().is_empty()).map(PathBuf::from),
            ansi: ansi.map(|v| matches!(v.trim(), "true" | "1")),
        }
    }
}

/// Install the global subscriber. Hold the returned guard until exit so
/// buffered file output is flushed.
pub fn init_tracing(settings: &LogSettings) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    let guard = match &settings.file {
        Some(path) => {
            let dir = path.parent().unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .and_then(|f| f.to_str())
                .unwrap_or("orthox-api.log");
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name));
            match settings.format {
                LogFormat::Json => registry.with(fmt::layer().json().with_writer(writer)).init(),
                LogFormat::Text => registry
                    .with(
                        fmt::layer()
                            .with_writer(writer)
                            .with_ansi(settings.ansi.unwrap_or(false)),
                    )
                    .init(),
            }
            Some(guard)
        }
        None => {
            match settings.format {
                LogFormat::Json => registry.with(fmt::layer().json()).init(),
                LogFormat::Text => {
                    let layer = match settings.ansi {
                        Some(ansi) => fmt::layer().with_ansi(ansi),
                        None => fmt::layer(),
                    };
                    registry.with(layer).init()
                }
            }
            None
        }
    };

    info!(
        subsystem = "api",
        log_format = ?settings.format,
        log_file = ?settings.file,
        "Logging initialized"
    );
    guard
}
