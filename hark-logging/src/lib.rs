//! Logging setup for hark.
//!
//! Console output goes to stderr so that command output on stdout stays
//! clean; when a log file is given every event is also appended to it.
//!
//! Environment:
//! - `HARK_LOG` overrides the level/filter directives (`EnvFilter` syntax)
//! - `HARK_LOG_FORMAT=json` switches both layers to JSON

use std::{env, path::Path};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

pub const FILTER_ENV: &str = "HARK_LOG";
pub const FORMAT_ENV: &str = "HARK_LOG_FORMAT";

/// Where and how events should be written.
#[derive(Debug, Clone)]
pub struct LogSettings<'a> {
    pub level: &'a str,
    pub log_file: Option<&'a Path>,
    pub json: bool,
}

impl<'a> LogSettings<'a> {
    pub fn new(level: &'a str) -> Self {
        Self {
            level,
            log_file: None,
            json: env::var(FORMAT_ENV).is_ok_and(|v| v == "json"),
        }
    }

    pub fn with_file(mut self, path: &'a Path) -> Self {
        self.log_file = Some(path);
        self
    }
}

/// Build the filter: `HARK_LOG` wins, otherwise the configured level.
/// Chatty dependencies are capped at `warn`.
pub fn build_filter(level: &str) -> EnvFilter {
    let filter = EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(level));
    ["sqlx=warn", "hyper=warn", "reqwest=warn"]
        .into_iter()
        .filter_map(|directive| directive.parse().ok())
        .fold(filter, |filter, directive| filter.add_directive(directive))
}

/// Initializes the global tracing subscriber.
///
/// Returns the file writer's guard; dropping it flushes and stops the
/// background writer, so the caller keeps it alive for the whole process.
/// Returns `None` without installing anything if a subscriber is already set.
pub fn init_subscriber(settings: &LogSettings<'_>) -> Option<WorkerGuard> {
    let filter = build_filter(settings.level);
    let subscriber = registry().with(filter);

    let Some(path) = settings.log_file else {
        let _ = if settings.json {
            subscriber
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
        } else {
            subscriber
                .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
                .try_init()
        };
        return None;
    };

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().unwrap_or("hark.log".as_ref());
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let installed = if settings.json {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(fmt::layer().json().with_writer(non_blocking).with_ansi(false))
            .try_init()
    } else {
        subscriber
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
            .try_init()
    };
    installed.ok().map(|_| guard)
}
