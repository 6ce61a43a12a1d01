use chrono::{DateTime, Local};
use std::fmt;

use super::markup;

/// Timestamp layout used for every log line, both on disk and in the view.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Severity of a user-facing log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Debug,
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    /// Upper-case label written into the log line
    pub fn label(self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Success => "SUCCESS",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }

    /// CSS colour name used when the entry is rendered as markup
    pub fn css_color(self) -> &'static str {
        match self {
            Severity::Debug => "gray",
            Severity::Info => "black",
            Severity::Success => "green",
            Severity::Warning => "orange",
            Severity::Error => "red",
        }
    }

    /// RGB triple for views that do not speak CSS (the Slint log list)
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            Severity::Debug => (128, 128, 128),
            Severity::Info => (0, 0, 0),
            Severity::Success => (0, 128, 0),
            Severity::Warning => (255, 165, 0),
            Severity::Error => (255, 0, 0),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single append-only log record.
///
/// `is_markup` marks messages the caller already built as safe markup (the
/// artifact link). Everything else is treated as literal text and escaped
/// before it reaches a markup-capable view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub severity: Severity,
    pub message: String,
    pub is_markup: bool,
}

impl LogEntry {
    pub fn new(severity: Severity, message: impl Into<String>, is_markup: bool) -> Self {
        Self {
            timestamp: Local::now(),
            severity,
            message: message.into(),
            is_markup,
        }
    }

    /// `YYYY-MM-DD HH:MM:SS <SEVERITY> [*] <message>` without a trailing newline
    pub fn line(&self) -> String {
        format!(
            "{} {} [*] {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.severity,
            self.message
        )
    }

    /// Render the entry as a coloured markup span.
    pub fn to_markup(&self) -> String {
        let body = if self.is_markup {
            self.line()
        } else {
            markup::escape(&self.line())
        };
        format!(
            r#"<span style="color:{};">{}</span>"#,
            self.severity.css_color(),
            body
        )
    }

    /// Plain text for the log list plus the link target, if the entry carries one.
    ///
    /// Markup entries have their tags stripped; plain entries are returned
    /// verbatim so markup characters show up literally.
    pub fn view_text(&self) -> (String, Option<String>) {
        if !self.is_markup {
            return (self.line(), None);
        }

        let link = markup::parse_link(&self.message);
        let text = format!(
            "{} {} [*] {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.severity,
            markup::strip_tags(&self.message)
        );
        (text, link)
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line())
    }
}
