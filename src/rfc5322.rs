use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref HEADER_LINE: Regex = Regex::new(r"^([!-9;-~]+):").unwrap();
}

/// Drop repeated header fields from an original-message excerpt.
///
/// The first occurrence of each field name (case-insensitive) is kept along
/// with its folded continuation lines; later occurrences and their
/// continuations are removed. Lines that are not header fields pass through.
pub fn weed_out<S: AsRef<str>>(lines: &[S]) -> String {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(lines.len());
    let mut skipping = false;

    for line in lines.iter().map(AsRef::as_ref) {
        if line.starts_with(' ') || line.starts_with('\t') {
            if !skipping {
                kept.push(line);
            }
            continue;
        }

        skipping = false;
        if let Some(caps) = HEADER_LINE.captures(line) {
            if !seen.insert(caps[1].to_lowercase()) {
                skipping = true;
                continue;
            }
        }
        kept.push(line);
    }

    let mut excerpt = kept.join("\n");
    if !excerpt.is_empty() {
        excerpt.push('\n');
    }
    excerpt
}
