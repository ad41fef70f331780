//! Logging setup and the injectable telemetry sink
//!
//! The binary installs a global subscriber once via [`init_tracing`]. Library
//! components do not log through that global implicitly: they hold a
//! [`Telemetry`] handed to them at construction and emit inside its scope.

use crate::config::LogConfig;
use crate::error::{AppError, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::dispatcher::{self, Dispatch};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install console and file logging.
///
/// Console gets `console_level` and above, the log file gets `file_level`
/// and above. `RUST_LOG`, when set, filters both.
pub fn init_tracing(config: &LogConfig) -> Result<()> {
    let console_level = parse_level(&config.console_level)?;
    let file_level = parse_level(&config.file_level)?;

    let env_filter = EnvFilter::try_from_default_env().ok();

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(console_level);

    let file_layer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true)
                    .with_filter(file_level),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("tracing already initialized: {}", e)))
}

fn parse_level(level: &str) -> Result<LevelFilter> {
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Config(format!("invalid log level '{}'", level)))
}

/// Telemetry sink handed to library components
#[derive(Clone)]
pub struct Telemetry {
    dispatch: Dispatch,
}

impl Telemetry {
    pub fn new(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }

    /// Whatever subscriber is current for the calling thread
    pub fn current() -> Self {
        Self::new(dispatcher::get_default(|d| d.clone()))
    }

    /// Drop every event
    pub fn silent() -> Self {
        Self::new(Dispatch::none())
    }

    /// Run `f` with this sink as the active subscriber
    pub fn scope<R>(&self, f: impl FnOnce() -> R) -> R {
        dispatcher::with_default(&self.dispatch, f)
    }
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry").finish_non_exhaustive()
    }
}
