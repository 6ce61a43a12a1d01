//! Data models for the Build AOSP Image application.
//!
//! - [`AppState`]: GUI state (selected inputs, building flag, last artifact)
//! - [`UserConfig`]: build settings loaded from `settings.yaml`
//! - [`RepackRequest`]: inputs of one repack run
//! - [`LogEntry`] / [`Severity`]: user-facing log records
//! - [`markup`]: escaping and link helpers for the log view

pub mod app_state;
pub mod config;
pub mod log_entry;
pub mod markup;
pub mod request;

pub use app_state::AppState;
pub use config::{BuildSettings, UserConfig};
pub use log_entry::{LogEntry, Severity, TIMESTAMP_FORMAT};
pub use request::RepackRequest;
