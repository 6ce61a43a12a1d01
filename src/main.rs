//! build-aosp-image - repack Android factory images with custom partition images
//!
//! Main entry point for the GUI application.
//!
//! # Overview
//!
//! The binary initializes:
//! - Settings ([`ConfigManager`], `config/settings.yaml` next to the executable)
//! - Diagnostics logging (daily rotating files under `logs/` plus console output)
//! - Tokio runtime (builds run on its blocking pool)
//! - The build log ([`LogSink`], `app.log` by default)
//! - State management ([`StateManager`])
//! - GUI controller ([`GuiController`])
//!
//! Threading model:
//! - **Main thread**: runs the Slint event loop
//! - **Tokio blocking worker**: runs the one in-flight repack
//! - **Bridge threads**: forward state events and log entries onto the event loop
//!
//! # Shutdown
//!
//! After the window closes, any in-flight build is awaited, the runtime is
//! shut down and the build log is closed.

use anyhow::{Context, Result};
use build_aosp_image::config::application_dir;
use build_aosp_image::services::{ArchiveRepacker, BuildRunner, FileRevealer, LogSink};
use build_aosp_image::ui::GuiController;
use build_aosp_image::{APP_NAME, ConfigManager, StateManager, VERSION};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    let app_dir = application_dir()?;

    // Settings decide the diagnostics level, so they are read before logging starts
    let config_manager = ConfigManager::new(app_dir.join("config"))?;
    config_manager.ensure_user_config()?;
    let user_config = config_manager.load_user_config()?;
    let settings = &user_config.build_settings;

    let _log_guard = build_aosp_image::logging::setup_logging(
        &app_dir.join("logs"),
        APP_NAME,
        settings.debug_mode,
        true,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    tracing::info!("Settings: {}", config_manager.settings_path());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("build-aosp-image-worker")
        .build()
        .context("Failed to create tokio runtime")?;

    let (log_sink, log_stream) = LogSink::open(settings.resolve_log_file(&app_dir))?;
    let log_sink = Arc::new(log_sink);
    tracing::info!("Build log: {}", log_sink.path());

    let repacker = Arc::new(ArchiveRepacker::from_settings(
        settings,
        &app_dir,
        Arc::clone(&log_sink),
    ));
    tracing::info!("Output directory: {}", repacker.output_dir());

    let runner = Arc::new(BuildRunner::new(
        repacker,
        Arc::clone(&log_sink),
        runtime.handle().clone(),
    ));
    let state_manager = Arc::new(StateManager::new());

    let gui_controller = GuiController::new(
        state_manager,
        Arc::clone(&runner),
        Arc::clone(&log_sink),
        log_stream,
        settings,
        FileRevealer::detect(),
    )?;

    tracing::info!("GUI controller initialized, launching window");

    // Blocks until the window is closed
    let result = gui_controller.run();

    tracing::info!("GUI closed, shutting down");

    if runner.is_running() {
        tracing::warn!("Window closed during a build - waiting for it to finish");
    }
    runtime.block_on(runner.wait());
    runtime.shutdown_timeout(Duration::from_secs(5));

    if let Err(e) = log_sink.close() {
        tracing::error!("Failed to close build log: {}", e);
    }

    tracing::info!("Application shutdown complete");

    result.map_err(|e| {
        tracing::error!("GUI error: {}", e);
        anyhow::anyhow!("GUI error: {}", e)
    })
}
