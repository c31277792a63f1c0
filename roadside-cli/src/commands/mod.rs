//! CLI command implementations

pub mod auth;
pub mod estimate;
pub mod geocode;
pub mod logs;
pub mod map;
pub mod mock;
pub mod request;
pub mod status;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use roadside_core::config::Config;
use roadside_core::{
    AppState, BootSequencer, EntryPoint, LogEvent, LoggingService, RoadsideContext,
};

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let dir = get_roadside_dir().ok()?;
    std::fs::create_dir_all(&dir).ok()?;
    let logger = LoggingService::new(&dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()?;
    match Config::load(&dir) {
        Ok(config) => Some(logger.with_default_mode(config.mode())),
        Err(_) => Some(logger),
    }
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the profile directory from environment or default
pub fn get_roadside_dir() -> Result<PathBuf> {
    roadside_core::config::roadside_dir()
}

/// Get or create the roadside context
pub fn get_context() -> Result<RoadsideContext> {
    let dir = get_roadside_dir()?;

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create roadside directory: {:?}", dir))?;

    RoadsideContext::new(&dir).context("Failed to initialize roadside context")
}

/// Spinner on stderr while a network-bound step runs
pub fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Run the boot sequence once and return the settled state
///
/// A boot error is logged and reported on stderr but never fails the
/// command; the session is simply treated as signed out.
pub async fn boot(ctx: &RoadsideContext) -> AppState {
    let bar = spinner("Checking session...");
    let mut handle = BootSequencer::start(Arc::clone(&ctx.access), ctx.boot_options());
    let state = handle.booted().await;
    handle.shutdown().await;
    bar.finish_and_clear();

    if let Some(message) = &state.boot_error {
        let logger = get_logger();
        log_event(
            &logger,
            LogEvent::new("boot_failed")
                .with_mode(ctx.config.mode())
                .with_error(message.as_str()),
        );
        crate::output::warning(message);
    }
    state
}
