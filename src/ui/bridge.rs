// EventLoopBridge - marshals work from background threads onto the Slint event loop
//
// Slint components may only be touched on the event loop thread, while state
// events and build log entries are produced on tokio workers. The bridge owns
// a forwarding thread per source; each forwarded item becomes one
// `upgrade_in_event_loop` call, and those run in the order they were queued.

use crate::models::LogEntry;
use crate::services::LogStream;
use slint::{ComponentHandle, Weak};
use tokio::sync::mpsc;

type UiUpdate<T> = Box<dyn FnOnce(&T) + Send>;

/// Coordinates between background threads and the Slint event loop
pub struct EventLoopBridge<T: ComponentHandle> {
    /// Weak reference to the UI component to prevent circular references
    ui_weak: Weak<T>,

    /// Channel for sending UI update requests to the forwarding thread.
    /// Unbounded: a dropped "build finished" update would leave the UI disabled.
    ui_update_tx: mpsc::UnboundedSender<UiUpdate<T>>,
}

impl<T: ComponentHandle + 'static> EventLoopBridge<T> {
    /// Create a new bridge and start its forwarding thread
    pub fn new(ui: &T) -> Self {
        let ui_weak = ui.as_weak();
        let (ui_update_tx, mut ui_update_rx) = mpsc::unbounded_channel::<UiUpdate<T>>();

        let ui_weak_clone = ui_weak.clone();
        std::thread::Builder::new()
            .name("ui-update-bridge".to_string())
            .spawn(move || {
                tracing::debug!("EventLoopBridge handler thread started");

                while let Some(update_fn) = ui_update_rx.blocking_recv() {
                    let result = ui_weak_clone.upgrade_in_event_loop(move |ui| {
                        update_fn(&ui);
                    });

                    if let Err(e) = result {
                        // The event loop has stopped; nothing left to update
                        tracing::warn!("Failed to queue UI update to event loop: {:?}", e);
                        break;
                    }
                }

                tracing::debug!("EventLoopBridge handler thread terminated");
            })
            .map_err(|e| tracing::error!("Failed to spawn UI bridge thread: {}", e))
            .ok();

        Self {
            ui_weak,
            ui_update_tx,
        }
    }

    /// Drain `stream` on a dedicated thread, applying each entry on the event loop.
    ///
    /// Entries are applied in the order they were emitted. The thread exits when
    /// the log sink is dropped or the event loop stops.
    pub fn forward_log_stream<F>(&self, mut stream: LogStream, apply: F)
    where
        F: Fn(&T, LogEntry) + Send + Clone + 'static,
    {
        let ui_weak = self.ui_weak.clone();

        let spawned = std::thread::Builder::new()
            .name("log-view-bridge".to_string())
            .spawn(move || {
                while let Some(entry) = stream.blocking_recv() {
                    let apply = apply.clone();
                    if ui_weak
                        .upgrade_in_event_loop(move |ui| apply(&ui, entry))
                        .is_err()
                    {
                        tracing::debug!("Event loop stopped - log view forwarding ends");
                        break;
                    }
                }
            });

        if let Err(e) = spawned {
            tracing::error!("Failed to spawn log view thread: {}", e);
        }
    }

    /// Cloneable handle for use inside callbacks
    pub fn clone_handle(&self) -> EventLoopBridgeHandle<T> {
        EventLoopBridgeHandle {
            ui_update_tx: self.ui_update_tx.clone(),
        }
    }
}

/// Lightweight handle that can be cloned and passed to callbacks
pub struct EventLoopBridgeHandle<T: ComponentHandle> {
    ui_update_tx: mpsc::UnboundedSender<UiUpdate<T>>,
}

// Manual Clone implementation to avoid requiring T: Clone
impl<T: ComponentHandle> Clone for EventLoopBridgeHandle<T> {
    fn clone(&self) -> Self {
        Self {
            ui_update_tx: self.ui_update_tx.clone(),
        }
    }
}

impl<T: ComponentHandle + 'static> EventLoopBridgeHandle<T> {
    /// Schedule a UI update from any thread
    pub fn update_ui<F>(&self, update: F)
    where
        F: FnOnce(&T) + Send + 'static,
    {
        if self.ui_update_tx.send(Box::new(update)).is_err() {
            tracing::warn!("Failed to send UI update - handler thread has stopped");
        }
    }
}
