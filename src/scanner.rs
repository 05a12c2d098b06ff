//! Line scanner that turns a bounce body into delivery-status records.
//!
//! Bounce bodies share no grammar, so the scanner is a small state machine
//! driven by the markers and field patterns of one [`PatternSet`]. Lines it
//! cannot place are dropped rather than treated as errors.

use crate::delivery_status::{BounceReport, DeliveryStatusRecord};
use crate::error::ParseError;
use crate::message::Headers;
use crate::normalization::normalize_diagnosis;
use crate::pattern_set::PatternSet;
use crate::rfc5322;
use crate::smtp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Preamble,
    DeliveryStatus,
    MessageExcerpt,
    Done,
}

struct ScanState<'p, 'b> {
    patterns: &'p PatternSet,
    phase: Phase,
    records: Vec<DeliveryStatusRecord>,
    current: DeliveryStatusRecord,
    /// Set after a bare reason label; the next line becomes the diagnosis.
    awaiting_reason: bool,
    recipients: usize,
    excerpt: Vec<&'b str>,
    blank_lines: usize,
    unmatched_lines: usize,
    reply_code: Option<u16>,
}

impl<'p, 'b> ScanState<'p, 'b> {
    fn new(patterns: &'p PatternSet, reply_code: Option<u16>) -> Self {
        Self {
            patterns,
            phase: Phase::Preamble,
            records: Vec::new(),
            current: DeliveryStatusRecord::default(),
            awaiting_reason: false,
            recipients: 0,
            excerpt: Vec::new(),
            blank_lines: 0,
            unmatched_lines: 0,
            reply_code,
        }
    }

    fn enter(&mut self, phase: Phase) {
        log::trace!("{}: {:?} -> {:?}", self.patterns.name, self.phase, phase);
        self.phase = phase;
    }

    fn feed(&mut self, line: &'b str) {
        let patterns = self.patterns;
        let markers = &patterns.markers;

        if let Some(end) = &markers.end {
            if end.is_match(line) {
                self.enter(Phase::Done);
                return;
            }
        }

        match self.phase {
            Phase::Preamble => {
                if markers.begin.is_match(line) {
                    self.enter(Phase::DeliveryStatus);
                } else if markers.rfc822.is_match(line) {
                    self.enter(Phase::MessageExcerpt);
                }
            }
            Phase::DeliveryStatus => {
                if markers.rfc822.is_match(line) {
                    self.enter(Phase::MessageExcerpt);
                } else {
                    self.read_status_line(line);
                }
            }
            Phase::MessageExcerpt => {
                if line.trim().is_empty() {
                    self.blank_lines += 1;
                    if self.blank_lines > 1 {
                        self.enter(Phase::Done);
                    }
                } else {
                    self.excerpt.push(line);
                }
            }
            Phase::Done => {}
        }
    }

    fn read_status_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }

        let patterns = self.patterns;
        let fields = &patterns.fields;

        // "kijitora@example.jp": or <kijitora@example.jp>
        let address = fields
            .recipient
            .iter()
            .find_map(|re| re.captures(line))
            .and_then(|caps| caps.get(1));
        if let Some(address) = address {
            if self.current.has_recipient() {
                let finished = std::mem::take(&mut self.current);
                log::debug!("{}: record for {} complete", patterns.name, finished.recipient);
                self.records.push(finished);
                self.awaiting_reason = false;
            }
            self.current.recipient = address.as_str().to_string();
            self.recipients += 1;
            return;
        }

        // SMTP error from remote server after RCPT command:
        if let Some(command) = fields.command.captures(line).and_then(|caps| caps.get(1)) {
            self.current.command = command.as_str().to_string();
            return;
        }

        // host: mx.example.jp
        if let Some(host) = fields.host.captures(line).and_then(|caps| caps.get(1)) {
            self.current.rhost = host.as_str().trim().to_string();
            return;
        }

        if self.awaiting_reason {
            self.current.diagnosis = line.to_string();
            self.awaiting_reason = false;
            return;
        }

        // Reason:
        // delivery retry timeout exceeded
        if fields.reason_label.is_match(line) {
            self.current.diagnosis = line.to_string();
            self.awaiting_reason = true;
            return;
        }

        if fields.diagnosis.iter().any(|re| re.is_match(line)) {
            if self.current.diagnosis.is_empty() {
                self.current.diagnosis = line.to_string();
            }
            return;
        }

        self.unmatched_lines += 1;
        log::trace!("{}: dropping unrecognized line: {}", patterns.name, line);
    }

    fn finish(mut self) -> Result<BounceReport, ParseError> {
        if self.current.has_recipient() {
            self.records.push(std::mem::take(&mut self.current));
        }

        if self.recipients == 0 {
            log::debug!("{}: signature matched but no recipients found", self.patterns.name);
            return Err(ParseError::NoRecipients);
        }

        let patterns = self.patterns;
        let reply_code = self.reply_code;
        let records = self
            .records
            .into_iter()
            .map(|record| finalize(patterns, record, reply_code))
            .collect();

        Ok(BounceReport {
            agent: patterns.name.clone(),
            records,
            excerpt: rfc5322::weed_out(&self.excerpt),
            unmatched_lines: self.unmatched_lines,
        })
    }
}

fn finalize(
    patterns: &PatternSet,
    mut record: DeliveryStatusRecord,
    reply_code: Option<u16>,
) -> DeliveryStatusRecord {
    record.agent = patterns.name.clone();
    record.reply_code = reply_code;
    record.diagnosis = normalize_diagnosis(&record.diagnosis);
    record.status = smtp::find_status(&record.diagnosis).unwrap_or_default();
    record.reason = Some(patterns.classify(&record));
    record
}

/// Scan one message with one pattern set.
///
/// Fails with [`ParseError::NotRecognized`] before looking at the body when
/// the headers do not carry the provider's signature, and with
/// [`ParseError::NoRecipients`] when the body yields no recipient.
pub fn scan(patterns: &PatternSet, headers: &Headers, body: &str) -> Result<BounceReport, ParseError> {
    scan_with_reply_code(patterns, headers, body, None)
}

/// Like [`scan`], for callers that know the SMTP reply code from outside the
/// body (a DSN part, the delivery log). It is set on every record before
/// classification. The body itself is never searched for one.
pub fn scan_with_reply_code(
    patterns: &PatternSet,
    headers: &Headers,
    body: &str,
    reply_code: Option<u16>,
) -> Result<BounceReport, ParseError> {
    if !patterns.matches_signature(headers) {
        return Err(ParseError::NotRecognized);
    }

    let mut state = ScanState::new(patterns, reply_code);
    for line in body.lines() {
        state.feed(line);
        if state.phase == Phase::Done {
            break;
        }
    }

    state.finish()
}
