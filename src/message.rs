//! Minimal header/body split for already-decoded messages.
//!
//! This does no MIME or charset work. It exists so raw `.eml` text that is
//! already plain can be fed to the parsers.

use std::collections::HashMap;

/// Header map with lower-cased names. Repeated headers keep every value in
/// the order they appeared.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Headers {
    fields: HashMap<String, Vec<String>>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.fields
            .entry(name.trim().to_lowercase())
            .or_default()
            .push(value.into());
    }

    /// First value of a header.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.fields
            .get(&name.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        !self.get_all(name).is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name.as_ref(), value);
        }
        headers
    }
}

/// Split raw message text into headers and body at the first blank line.
pub fn split_message(raw: &str) -> (Headers, String) {
    let mut headers = Headers::new();
    let mut body = String::new();
    let mut in_headers = true;
    let mut current: Option<(String, String)> = None;

    for line in raw.lines() {
        if in_headers {
            if line.trim().is_empty() {
                in_headers = false;
                continue;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                // Folded continuation of the previous header
                if let Some((_, value)) = current.as_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }

            if let Some((name, value)) = current.take() {
                headers.insert(&name, value);
            }

            if let Some((name, value)) = line.split_once(':') {
                current = Some((name.to_string(), value.trim().to_string()));
            } else {
                log::trace!("Ignoring malformed header line: {line}");
            }
        } else {
            body.push_str(line);
            body.push('\n');
        }
    }

    if let Some((name, value)) = current.take() {
        headers.insert(&name, value);
    }

    (headers, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_unfolds_and_lowercases() {
        let raw = "From: MAILER-DAEMON@gmx.net\r\n\
                   Subject: Mail delivery failed:\r\n \treturning message to sender\r\n\
                   Received: from a\r\n\
                   Received: from b\r\n\
                   X-GMX-Antispam: 0 (Mail was not recognized as spam)\r\n\
                   \r\n\
                   first body line\r\n\
                   \r\n\
                   second body line\r\n";

        let (headers, body) = split_message(raw);

        assert_eq!(headers.get("from"), Some("MAILER-DAEMON@gmx.net"));
        assert_eq!(
            headers.get("Subject"),
            Some("Mail delivery failed: returning message to sender")
        );
        assert_eq!(headers.get_all("received"), ["from a", "from b"]);
        assert!(headers.contains("x-gmx-antispam"));
        assert_eq!(body, "first body line\n\nsecond body line\n");
    }

    #[test]
    fn test_message_without_body() {
        let (headers, body) = split_message("Subject: only headers");
        assert_eq!(headers.get("subject"), Some("only headers"));
        assert!(body.is_empty());
    }

    #[test]
    fn test_collect_headers() {
        let headers: Headers = [("X-Test", "a"), ("x-test", "b")].into_iter().collect();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get_all("X-TEST"), ["a", "b"]);
        assert!(headers.get("missing").is_none());
    }
}
