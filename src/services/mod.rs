//! Services module - business logic for repacking factory images.
//!
//! Everything here is **framework-agnostic**: no Slint types, so the whole
//! build pipeline can be driven from tests.
//!
//! # Components
//!
//! - [`ArchiveRepacker`]: unzip the factory image, swap payload images inside
//!   the nested archive, re-zip both levels with stored entries, clean up.
//! - [`LogSink`] / [`LogStream`]: user-facing build log, written to `app.log`
//!   and streamed in order to the log view.
//! - [`BuildRunner`]: runs one repack at a time on tokio's blocking pool and
//!   guarantees the finish sequence (log entry + callback) on every path.
//! - [`FileRevealer`]: per-platform "show in file browser" for the artifact link.
//!
//! # Usage Example
//!
//! ```ignore
//! use build_aosp_image::services::{ArchiveRepacker, BuildRunner, LogSink};
//!
//! let (log, stream) = LogSink::open("app.log")?;
//! let log = Arc::new(log);
//! let repacker = Arc::new(ArchiveRepacker::new("out", log.clone()));
//! let runner = BuildRunner::new(repacker, log, runtime.handle().clone());
//!
//! runner.start(RepackRequest::from_fields("factory.zip", "boot.img"), |outcome| {
//!     println!("artifact: {:?}", outcome.artifact());
//! })?;
//! ```

pub mod archive;
pub mod log_sink;
pub mod repacker;
pub mod reveal;
pub mod runner;

pub use log_sink::{LogSink, LogStream};
pub use repacker::{ArchiveRepacker, RepackError, RepackResult, StructureError};
pub use reveal::FileRevealer;
pub use runner::{BuildOutcome, BuildRunner, BuildSlot, RepackJob, RunnerError};
