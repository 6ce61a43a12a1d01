// State management module
//
// This module provides the StateManager which wraps AppState with thread-safe access
// using Arc<RwLock<T>> and emits change events for GUI updates.

use crate::models::AppState;
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when state is modified
///
/// These events are emitted to notify interested parties (primarily the GUI)
/// about state changes without requiring them to poll the state.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// Factory image or payload selection changed
    InputsChanged { can_build: bool },

    /// A build has started; triggers must be disabled
    BuildStarted,

    /// A build has ended; triggers must be re-enabled
    BuildFinished { artifact: Option<Utf8PathBuf> },
}

/// Thread-safe state manager with event emission
///
/// - [`read()`](Self::read) for reading state
/// - [`update()`](Self::update) for mutations with automatic event emission
/// - [`subscribe()`](Self::subscribe) for listening to state changes
#[derive(Clone)]
pub struct StateManager {
    /// The application state protected by RwLock for thread-safe access
    state: Arc<RwLock<AppState>>,

    /// Broadcast channel for emitting state change events
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager with default state and a 100 event buffer
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(AppState::default())),
            state_tx,
        }
    }

    /// Clone of the current state
    pub fn snapshot(&self) -> AppState {
        self.read(AppState::clone)
    }

    /// Execute a function with read access to the state
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&AppState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// Returns the events that were emitted.
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut AppState),
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = Self::detect_changes(&old_state, &state);
        for change in &changes {
            // Ignore send errors - it's OK if no one is listening
            let _ = self.state_tx.send(change.clone());
        }

        changes
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn detect_changes(old: &AppState, new: &AppState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.factory_image_path != new.factory_image_path
            || old.payload_paths != new.payload_paths
        {
            changes.push(StateChange::InputsChanged {
                can_build: new.can_build(),
            });
        }

        if old.is_building != new.is_building {
            if new.is_building {
                changes.push(StateChange::BuildStarted);
            } else {
                changes.push(StateChange::BuildFinished {
                    artifact: new.last_artifact.clone(),
                });
            }
        }

        changes
    }

    // Convenience methods for common state updates

    /// Set the factory image archive
    pub fn set_factory_image_path(&self, path: Option<Utf8PathBuf>) -> Vec<StateChange> {
        self.update(|state| state.factory_image_path = path)
    }

    /// Replace the payload list
    pub fn set_payload_paths(&self, paths: Vec<Utf8PathBuf>) -> Vec<StateChange> {
        self.update(|state| state.payload_paths = paths)
    }

    /// Mark a build as started; clears the previous artifact
    pub fn start_build(&self) -> Vec<StateChange> {
        self.update(|state| {
            state.is_building = true;
            state.last_artifact = None;
        })
    }

    /// Mark the build as finished, recording the artifact on success
    pub fn finish_build(&self, artifact: Option<&Utf8Path>) -> Vec<StateChange> {
        self.update(|state| {
            state.is_building = false;
            state.last_artifact = artifact.map(Utf8Path::to_path_buf);
        })
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}
