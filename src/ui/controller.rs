// GUI Controller - Bridges the Slint window with the build services
//
// The GuiController wires:
// - Slint callbacks (pickers, build button, log links) to StateManager/BuildRunner
// - StateManager events back to the window through the EventLoopBridge
// - The LogSink stream into the log view

use crate::models::request::split_payload_field;
use crate::models::{BuildSettings, LogEntry, RepackRequest};
use crate::services::{BuildRunner, FileRevealer, LogSink, LogStream};
use crate::state::{StateChange, StateManager};
use crate::ui::bridge::EventLoopBridge;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use slint::{Model, ModelRc, VecModel};
use std::rc::Rc;
use std::sync::Arc;

// Include the generated Slint code
slint::include_modules!();

/// Extensions offered by the two file pickers
#[derive(Debug, Clone)]
struct PickerFilters {
    factory_image: String,
    payload: String,
}

impl From<&BuildSettings> for PickerFilters {
    fn from(settings: &BuildSettings) -> Self {
        Self {
            factory_image: settings.factory_image_extension.clone(),
            payload: settings.payload_extension.clone(),
        }
    }
}

/// GUI Controller that wires up the Slint window with application state and services
///
/// # Example
/// ```ignore
/// let (log, stream) = LogSink::open("app.log")?;
/// let controller = GuiController::new(
///     Arc::new(StateManager::new()),
///     runner,
///     Arc::new(log),
///     stream,
///     &settings,
///     FileRevealer::detect(),
/// )?;
/// controller.run()?;  // Blocks until window is closed
/// ```
pub struct GuiController {
    /// The Slint UI window
    ui: MainWindow,

    /// Keeps the forwarding threads' channel alive
    _bridge: EventLoopBridge<MainWindow>,
}

impl GuiController {
    /// Create the window and wire it to the given services
    pub fn new(
        state_manager: Arc<StateManager>,
        runner: Arc<BuildRunner>,
        log: Arc<LogSink>,
        log_stream: LogStream,
        settings: &BuildSettings,
        revealer: FileRevealer,
    ) -> Result<Self> {
        let ui = MainWindow::new().context("Failed to create Slint UI")?;
        let bridge = EventLoopBridge::new(&ui);

        let rows: Rc<VecModel<LogRow>> = Rc::new(VecModel::default());
        ui.set_log_rows(ModelRc::from(rows));

        Self::sync_ui_with_state(&ui, &state_manager);
        Self::setup_callbacks(
            &ui,
            &state_manager,
            &runner,
            &log,
            PickerFilters::from(settings),
            revealer,
        );
        Self::setup_state_subscription(&bridge, &state_manager);
        bridge.forward_log_stream(log_stream, Self::append_log_row);

        tracing::info!("GUI controller initialized");

        Ok(Self {
            ui,
            _bridge: bridge,
        })
    }

    /// Run the GUI (blocks until window is closed)
    pub fn run(self) -> Result<(), slint::PlatformError> {
        tracing::info!("Starting GUI event loop");
        self.ui.run()
    }

    fn sync_ui_with_state(ui: &MainWindow, state_manager: &StateManager) {
        let state = state_manager.snapshot();

        ui.set_factory_image_path(
            state
                .factory_image_path
                .as_ref()
                .map(|p| p.as_str().to_string())
                .unwrap_or_default()
                .into(),
        );
        ui.set_payload_paths(state.joined_payload_paths().into());
        ui.set_is_building(state.is_building);
        ui.set_can_build(state.can_build());
        ui.set_status_message(status_message(None).into());
    }

    fn setup_callbacks(
        ui: &MainWindow,
        state_manager: &Arc<StateManager>,
        runner: &Arc<BuildRunner>,
        log: &Arc<LogSink>,
        filters: PickerFilters,
        revealer: FileRevealer,
    ) {
        // Factory image picker
        let state = Arc::clone(state_manager);
        let ui_weak = ui.as_weak();
        let factory_extension = filters.factory_image.clone();
        ui.on_browse_factory_image(move || {
            let Some(path) = Self::show_file_picker(
                "Select Factory Image",
                ("Factory Image File Path", factory_extension.as_str()),
            ) else {
                return;
            };

            if let Some(ui) = ui_weak.upgrade() {
                ui.set_factory_image_path(path.as_str().into());
            }
            state.set_factory_image_path(Some(path));
        });

        // Payload picker; the selection replaces the field, joined with ';'
        let state = Arc::clone(state_manager);
        let ui_weak = ui.as_weak();
        let payload_extension = filters.payload.clone();
        ui.on_browse_payloads(move || {
            let paths = Self::show_files_picker(
                "Select Payload Images",
                ("Payload File Path", payload_extension.as_str()),
            );
            if paths.is_empty() {
                return;
            }

            state.set_payload_paths(paths);
            if let Some(ui) = ui_weak.upgrade() {
                ui.set_payload_paths(state.read(|s| s.joined_payload_paths()).into());
            }
        });

        // Typed edits keep the state in sync with the text fields
        let state = Arc::clone(state_manager);
        ui.on_factory_image_edited(move |text| {
            let text = text.trim();
            state.set_factory_image_path((!text.is_empty()).then(|| Utf8PathBuf::from(text)));
        });

        let state = Arc::clone(state_manager);
        ui.on_payloads_edited(move |text| {
            state.set_payload_paths(split_payload_field(&text));
        });

        // Build button
        let state = Arc::clone(state_manager);
        let runner_clone = Arc::clone(runner);
        let log_clone = Arc::clone(log);
        let ui_weak = ui.as_weak();
        ui.on_start_build(move || {
            let Some(ui) = ui_weak.upgrade() else {
                return;
            };

            let request =
                RepackRequest::from_fields(&ui.get_factory_image_path(), &ui.get_payload_paths());
            if request.source_archive.as_str().is_empty() {
                log_clone.warning("no factory image selected");
                return;
            }

            tracing::info!(
                "Build requested: {} with {} replacement(s)",
                request.source_archive,
                request.replacements.len()
            );

            let slot = match runner_clone.reserve() {
                Ok(slot) => slot,
                Err(e) => {
                    // The build already in flight will reset the state when it ends
                    tracing::warn!("Build request rejected: {}", e);
                    return;
                }
            };

            // Disable the triggers before the build can finish
            ui.set_is_building(true);
            state.start_build();

            let state_for_finish = Arc::clone(&state);
            slot.launch(request, move |outcome| {
                state_for_finish.finish_build(outcome.artifact());
            });
        });

        // Clicking the artifact link in the log view
        let log_clone = Arc::clone(log);
        ui.on_open_link(move |link| {
            let path = Utf8Path::new(link.as_str());
            match revealer.reveal(path) {
                Ok(true) => {}
                Ok(false) => log_clone.warning(format!("'{}' no longer exists", path)),
                Err(e) => log_clone.warning(format!("cannot reveal '{}': {:#}", path, e)),
            }
        });

        // Window close event handler
        let state = Arc::clone(state_manager);
        let log_clone = Arc::clone(log);
        ui.window().on_close_requested(move || {
            if state.read(|s| s.is_building) {
                log_clone.warning("build in progress - wait for it to finish before closing");
                slint::CloseRequestResponse::KeepWindowShown
            } else {
                tracing::info!("Close requested - allowing window to close");
                slint::CloseRequestResponse::HideWindow
            }
        });

        tracing::debug!("UI callbacks configured");
    }

    /// Subscribe to state changes and update UI accordingly
    fn setup_state_subscription(
        bridge: &EventLoopBridge<MainWindow>,
        state_manager: &Arc<StateManager>,
    ) {
        let bridge_handle = bridge.clone_handle();
        let mut rx = state_manager.subscribe();

        std::thread::spawn(move || {
            tracing::debug!("State subscription thread started");

            loop {
                match rx.blocking_recv() {
                    Ok(change) => {
                        tracing::trace!("State change received: {:?}", change);

                        match change {
                            StateChange::InputsChanged { can_build } => {
                                bridge_handle.update_ui(move |ui| ui.set_can_build(can_build));
                            }
                            StateChange::BuildStarted => {
                                bridge_handle.update_ui(|ui| {
                                    ui.set_is_building(true);
                                    ui.set_status_message("Building...".into());
                                });
                            }
                            StateChange::BuildFinished { artifact } => {
                                bridge_handle.update_ui(move |ui| {
                                    ui.set_is_building(false);
                                    ui.set_status_message(
                                        status_message(Some(artifact.as_deref())).into(),
                                    );
                                });
                            }
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("State subscription lagged, skipped {} events", skipped);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }

            tracing::debug!("State subscription thread terminated gracefully");
        });
    }

    /// Append one entry to the log view and keep the newest line visible
    fn append_log_row(ui: &MainWindow, entry: LogEntry) {
        let rows = ui.get_log_rows();
        if let Some(rows) = rows.as_any().downcast_ref::<VecModel<LogRow>>() {
            rows.push(log_row(&entry));
            ui.invoke_scroll_log_to_end();
        }
    }

    /// Show a native single-file picker
    fn show_file_picker(title: &str, filter: (&str, &str)) -> Option<Utf8PathBuf> {
        use rfd::FileDialog;

        FileDialog::new()
            .set_title(title)
            .add_filter(filter.0, &[filter.1])
            .pick_file()
            .and_then(|path| {
                Utf8PathBuf::try_from(path)
                    .map_err(|e| tracing::error!("Failed to convert path to UTF-8: {}", e))
                    .ok()
            })
    }

    /// Show a native multi-file picker; non UTF-8 selections are skipped
    fn show_files_picker(title: &str, filter: (&str, &str)) -> Vec<Utf8PathBuf> {
        use rfd::FileDialog;

        FileDialog::new()
            .set_title(title)
            .add_filter(filter.0, &[filter.1])
            .pick_files()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|path| {
                Utf8PathBuf::try_from(path)
                    .map_err(|e| tracing::error!("Failed to convert path to UTF-8: {}", e))
                    .ok()
            })
            .collect()
    }
}

/// Convert a log entry to the row shown in the log view
fn log_row(entry: &LogEntry) -> LogRow {
    let (text, link) = entry.view_text();
    let (r, g, b) = entry.severity.rgb();

    LogRow {
        text: text.into(),
        color: slint::Color::from_rgb_u8(r, g, b),
        link: link.unwrap_or_default().into(),
    }
}

/// Status line text. `None` before any build; `Some(None)` after a failed one.
fn status_message(finished: Option<Option<&Utf8Path>>) -> String {
    match finished {
        None => "Ready".to_string(),
        Some(Some(artifact)) => format!("Built {}", artifact),
        Some(None) => "Build failed, see the log for details".to_string(),
    }
}
