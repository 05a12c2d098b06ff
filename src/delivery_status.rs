use crate::reason::Reason;
use serde::{Deserialize, Serialize};

/// One failed recipient as read from a bounce body.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStatusRecord {
    pub recipient: String,
    /// SMTP verb the remote side rejected (`RCPT`, `MAIL`, `DATA`...), or empty.
    pub command: String,
    pub rhost: String,
    pub diagnosis: String,
    /// Enhanced status code found in the diagnosis, or empty.
    pub status: String,
    /// Reply code known from outside the body, e.g. from a DSN part.
    pub reply_code: Option<u16>,
    pub reason: Option<Reason>,
    pub agent: String,
}

impl DeliveryStatusRecord {
    pub fn has_recipient(&self) -> bool {
        !self.recipient.is_empty()
    }
}

/// Everything one provider parser extracted from one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BounceReport {
    pub agent: String,
    pub records: Vec<DeliveryStatusRecord>,
    /// Original-message excerpt with repeated header fields removed.
    pub excerpt: String,
    /// Non-blank delivery-status lines that matched no field pattern.
    pub unmatched_lines: usize,
}
