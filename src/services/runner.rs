// BuildRunner - runs one repack off the UI thread
//
// The repack itself is blocking filesystem work, so it goes to tokio's
// blocking pool. A small async task awaits it and performs the "finish"
// sequence no matter how the repack ended (Ok, Err or panic).
// Diagnostics only get a start and a finish line; the entries themselves stay
// in the build log.

use super::log_sink::LogSink;
use super::repacker::{ArchiveRepacker, RepackResult};
use crate::models::RepackRequest;
use crate::models::markup;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Errors returned when a build cannot be started
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunnerError {
    #[error("a build is already running")]
    Busy,
}

/// Outcome reported to the finish callback
#[derive(Debug)]
pub enum BuildOutcome {
    /// The repack ran to completion (successfully or not)
    Finished(RepackResult),

    /// The worker panicked; the message is what got logged
    Panicked(String),
}

impl BuildOutcome {
    /// Artifact path if the build succeeded
    pub fn artifact(&self) -> Option<&camino::Utf8Path> {
        match self {
            BuildOutcome::Finished(Ok(path)) => Some(path),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.artifact().is_some()
    }
}

/// The blocking work a build performs; normally [`ArchiveRepacker::repack`]
pub type RepackJob = Arc<dyn Fn(&RepackRequest) -> RepackResult + Send + Sync>;

/// Runs at most one repack at a time on a worker thread.
pub struct BuildRunner {
    job: RepackJob,
    log: Arc<LogSink>,
    tokio_handle: Handle,

    /// Handle of the in-flight (or last) build
    current: Mutex<Option<JoinHandle<()>>>,

    /// Cleared just before `on_finish` runs, so the UI can start the next build from it
    running: Arc<AtomicBool>,
}

/// Clears the running flag when dropped, including during a panic unwind
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A reserved build slot.
///
/// While it is held every other [`BuildRunner::start`] or
/// [`BuildRunner::reserve`] is rejected. Dropping it without calling
/// [`BuildSlot::launch`] frees the runner again.
pub struct BuildSlot<'a> {
    runner: &'a BuildRunner,
    in_flight: InFlight,
}

impl BuildRunner {
    pub fn new(repacker: Arc<ArchiveRepacker>, log: Arc<LogSink>, tokio_handle: Handle) -> Self {
        Self::with_job(
            Arc::new(move |request: &RepackRequest| repacker.repack(request)),
            log,
            tokio_handle,
        )
    }

    /// Runner around an arbitrary repack job
    pub fn with_job(job: RepackJob, log: Arc<LogSink>, tokio_handle: Handle) -> Self {
        Self {
            job,
            log,
            tokio_handle,
            current: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a build is currently in flight
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Claim the runner without starting anything yet.
    ///
    /// Lets a caller update its own state between winning the slot and
    /// launching, so the finish callback can never overtake that update.
    pub fn reserve(&self) -> Result<BuildSlot<'_>, RunnerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            self.log
                .warning("build already running - ignoring new build request");
            return Err(RunnerError::Busy);
        }

        Ok(BuildSlot {
            runner: self,
            in_flight: InFlight(Arc::clone(&self.running)),
        })
    }

    /// Start a build.
    ///
    /// `on_finish` runs on a runtime thread after the "finish" log entry,
    /// whatever the outcome. Rejected with [`RunnerError::Busy`] if a build is
    /// already in flight.
    pub fn start<F>(&self, request: RepackRequest, on_finish: F) -> Result<(), RunnerError>
    where
        F: FnOnce(BuildOutcome) + Send + 'static,
    {
        self.reserve()?.launch(request, on_finish);
        Ok(())
    }

    /// Wait for the in-flight build, if any, to finish.
    pub async fn wait(&self) {
        let handle = self.lock_current().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!("Build task join error: {}", e);
            }
        }
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BuildSlot<'_> {
    /// Run `request` in the reserved slot; see [`BuildRunner::start`]
    pub fn launch<F>(self, request: RepackRequest, on_finish: F)
    where
        F: FnOnce(BuildOutcome) + Send + 'static,
    {
        let BuildSlot { runner, in_flight } = self;
        let mut current = runner.lock_current();

        let job = Arc::clone(&runner.job);
        let log = Arc::clone(&runner.log);
        let tokio_handle = runner.tokio_handle.clone();

        let handle = runner.tokio_handle.spawn(async move {
            tracing::debug!("Build started: {}", request.source_archive);
            log.debug("start build aosp image");

            let worker_log = Arc::clone(&log);
            let joined = tokio_handle
                .spawn_blocking(move || {
                    let result = job(&request);
                    match &result {
                        Ok(artifact) => worker_log.success_markup(markup::file_link(artifact)),
                        Err(e) => worker_log.error(format!("exception: {}", e)),
                    }
                    result
                })
                .await;

            let outcome = match joined {
                Ok(result) => BuildOutcome::Finished(result),
                Err(join_error) => {
                    let message = format!("exception: build worker failed: {}", join_error);
                    log.error(message.clone());
                    BuildOutcome::Panicked(message)
                }
            };

            log.debug("finish build aosp image");
            tracing::debug!("Build finished: {:?}", outcome);
            drop(in_flight);
            on_finish(outcome);
        });

        *current = Some(handle);
    }
}
