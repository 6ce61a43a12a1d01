// LogSink - the user-facing build log
//
// Every entry goes to two places, in emit order:
// 1. An append-only text file opened once for the process lifetime
// 2. An unbounded channel drained by the UI (see ui::controller)
//
// The file write happens on the caller's thread. The UI side never touches the
// file, it only consumes the channel, so background workers never need access
// to Slint types.

use crate::models::{LogEntry, Severity};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

/// Thread-safe append-only log with a file sink and a channel sink
pub struct LogSink {
    path: Utf8PathBuf,

    /// `None` once the sink has been closed
    file: Mutex<Option<BufWriter<File>>>,

    tx: mpsc::UnboundedSender<LogEntry>,
}

/// Receiving half of a [`LogSink`], consumed by the live view
pub struct LogStream {
    rx: mpsc::UnboundedReceiver<LogEntry>,
}

impl LogSink {
    /// Open (or create) the log file in append mode.
    ///
    /// Returns the sink together with the stream the UI should drain.
    pub fn open(path: impl AsRef<Utf8Path>) -> Result<(Self, LogStream)> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {}", path))?;

        let (tx, rx) = mpsc::unbounded_channel();

        tracing::debug!("Log sink opened at {}", path);

        Ok((
            Self {
                path,
                file: Mutex::new(Some(BufWriter::new(file))),
                tx,
            },
            LogStream { rx },
        ))
    }

    /// Path of the backing log file
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Append an entry to both sinks.
    ///
    /// Never fails: a file write error is reported through `tracing` and the
    /// entry is still delivered to the view.
    pub fn emit(&self, severity: Severity, message: impl Into<String>, is_markup: bool) {
        let entry = LogEntry::new(severity, message, is_markup);

        // Holding the lock across both writes keeps file order and view order identical
        let mut file = self.lock_file();
        if let Some(writer) = file.as_mut() {
            let written = writeln!(writer, "{}", entry.line()).and_then(|_| writer.flush());
            if let Err(e) = written {
                tracing::warn!("Failed to write log file {}: {}", self.path, e);
            }
        }

        if self.tx.send(entry).is_err() {
            tracing::trace!("Log stream receiver dropped - entry kept in file only");
        }
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.emit(Severity::Debug, message, false);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(Severity::Info, message, false);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.emit(Severity::Success, message, false);
    }

    /// SUCCESS entry whose message is already safe markup
    pub fn success_markup(&self, markup: impl Into<String>) {
        self.emit(Severity::Success, markup, true);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.emit(Severity::Warning, message, false);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(Severity::Error, message, false);
    }

    /// Flush and close the backing file.
    ///
    /// Later entries still reach the view but are no longer persisted.
    /// Closing twice is a no-op.
    pub fn close(&self) -> std::io::Result<()> {
        let writer = self.lock_file().take();
        match writer {
            Some(mut writer) => {
                writer.flush()?;
                tracing::debug!("Log sink closed: {}", self.path);
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Whether the backing file is still open
    pub fn is_open(&self) -> bool {
        self.lock_file().is_some()
    }

    fn lock_file(&self) -> MutexGuard<'_, Option<BufWriter<File>>> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for LogSink {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Failed to flush log file {} on drop: {}", self.path, e);
        }
    }
}

impl LogStream {
    /// Wait for the next entry from a non-async thread.
    ///
    /// Returns `None` once the sink is dropped and the queue is drained.
    pub fn blocking_recv(&mut self) -> Option<LogEntry> {
        self.rx.blocking_recv()
    }

    /// Take an entry if one is already queued.
    pub fn try_recv(&mut self) -> Option<LogEntry> {
        self.rx.try_recv().ok()
    }
}
