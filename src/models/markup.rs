//! Minimal markup helpers for the log view.
//!
//! The log view only ever needs two things: escaping literal text and a
//! clickable link to a local file. Anything richer is out of scope.

use camino::Utf8Path;
use regex::Regex;
use std::sync::LazyLock;

static ANCHOR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<a\s+href="([^"]*)"[^>]*>"#).expect("Invalid anchor regex"));

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Invalid tag regex"));

/// Characters percent-encoded when a path is turned into a `file://` URL.
const URL_RESERVED: &[char] = &['%', ' ', '"', '<', '>', '#', '?', '&', '\''];

/// Escape text so a markup renderer shows it literally.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Reverse of [`escape`] for the entities it produces.
pub fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Build a `file://` URL for a local path.
pub fn file_url(path: &Utf8Path) -> String {
    let normalized = path.as_str().replace('\\', "/");
    let mut encoded = String::with_capacity(normalized.len());
    for c in normalized.chars() {
        if URL_RESERVED.contains(&c) {
            encoded.push_str(&format!("%{:02X}", c as u32));
        } else {
            encoded.push(c);
        }
    }

    if encoded.starts_with('/') {
        format!("file://{}", encoded)
    } else {
        format!("file:///{}", encoded)
    }
}

/// Anchor pointing at a local file, labelled with the escaped path.
pub fn file_link(path: &Utf8Path) -> String {
    format!(
        r#"<a href="{}">{}</a>"#,
        file_url(path),
        escape(path.as_str())
    )
}

/// Local path targeted by the first `file://` anchor in `markup`.
pub fn parse_link(markup: &str) -> Option<String> {
    let url = ANCHOR_PATTERN.captures(markup)?.get(1)?.as_str();
    let rest = url.strip_prefix("file://")?;

    // file:///C:/dir -> C:/dir, file:///home/x -> /home/x
    let rest = match rest.as_bytes() {
        [b'/', drive, b':', ..] if drive.is_ascii_alphabetic() => &rest[1..],
        _ => rest,
    };

    percent_decode(rest)
}

/// Visible text of a markup fragment.
pub fn strip_tags(markup: &str) -> String {
    unescape(&TAG_PATTERN.replace_all(markup, ""))
}

fn percent_decode(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = text.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
