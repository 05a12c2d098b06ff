//! Enhanced status code helpers.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ENHANCED_STATUS: Regex = Regex::new(r"\b([245])\.(\d{1,3})\.(\d{1,3})\b").unwrap();
}

/// First RFC 3463 enhanced status code (`class.subject.detail`) in `text`.
pub fn find_status(text: &str) -> Option<String> {
    ENHANCED_STATUS
        .captures(text)
        .map(|caps| format!("{}.{}.{}", &caps[1], &caps[2], &caps[3]))
}
