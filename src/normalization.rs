//! Diagnostic text cleanup.
//!
//! Bounce bodies wrap diagnosis lines arbitrarily and some MTAs leave literal
//! `\n` escapes in them. Everything downstream (status extraction, reason
//! rules) wants a single tidy line.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ESCAPED_NEWLINE: Regex = Regex::new(r"\\n").unwrap();
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

/// Collapse a raw diagnosis into one line.
///
/// Literal `\n` sequences become a space, every whitespace run becomes a
/// single space, and the result is trimmed. Normalizing the output again
/// returns it unchanged.
pub fn normalize_diagnosis(raw: &str) -> String {
    let unescaped = ESCAPED_NEWLINE.replace_all(raw, " ");
    WHITESPACE_RUN
        .replace_all(&unescaped, " ")
        .trim()
        .to_string()
}
