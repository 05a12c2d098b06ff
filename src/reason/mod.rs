pub mod catalog;
pub mod rule;

pub use rule::{Predicate, ReasonRule, ReasonRuleConfig, RuleCriteria};

use crate::delivery_status::DeliveryStatusRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical bounce reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reason {
    Blocked,
    ContentError,
    Delivered,
    ExceedLimit,
    Expired,
    Feedback,
    Filtered,
    HasMoved,
    HostUnknown,
    MailboxFull,
    MailerError,
    MesgTooBig,
    NetworkError,
    NoRelaying,
    NotAccept,
    OnHold,
    Rejected,
    SecurityError,
    SpamDetected,
    Suspend,
    SyntaxError,
    SystemError,
    SystemFull,
    TooManyConn,
    UserUnknown,
    Vacation,
    VirusInfected,
    Unknown,
}

impl Reason {
    pub const ALL: [Reason; 28] = [
        Reason::Blocked,
        Reason::ContentError,
        Reason::Delivered,
        Reason::ExceedLimit,
        Reason::Expired,
        Reason::Feedback,
        Reason::Filtered,
        Reason::HasMoved,
        Reason::HostUnknown,
        Reason::MailboxFull,
        Reason::MailerError,
        Reason::MesgTooBig,
        Reason::NetworkError,
        Reason::NoRelaying,
        Reason::NotAccept,
        Reason::OnHold,
        Reason::Rejected,
        Reason::SecurityError,
        Reason::SpamDetected,
        Reason::Suspend,
        Reason::SyntaxError,
        Reason::SystemError,
        Reason::SystemFull,
        Reason::TooManyConn,
        Reason::UserUnknown,
        Reason::Vacation,
        Reason::VirusInfected,
        Reason::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::Blocked => "blocked",
            Reason::ContentError => "contenterror",
            Reason::Delivered => "delivered",
            Reason::ExceedLimit => "exceedlimit",
            Reason::Expired => "expired",
            Reason::Feedback => "feedback",
            Reason::Filtered => "filtered",
            Reason::HasMoved => "hasmoved",
            Reason::HostUnknown => "hostunknown",
            Reason::MailboxFull => "mailboxfull",
            Reason::MailerError => "mailererror",
            Reason::MesgTooBig => "mesgtoobig",
            Reason::NetworkError => "networkerror",
            Reason::NoRelaying => "norelaying",
            Reason::NotAccept => "notaccept",
            Reason::OnHold => "onhold",
            Reason::Rejected => "rejected",
            Reason::SecurityError => "securityerror",
            Reason::SpamDetected => "spamdetected",
            Reason::Suspend => "suspend",
            Reason::SyntaxError => "syntaxerror",
            Reason::SystemError => "systemerror",
            Reason::SystemFull => "systemfull",
            Reason::TooManyConn => "toomanyconn",
            Reason::UserUnknown => "userunknown",
            Reason::Vacation => "vacation",
            Reason::VirusInfected => "virusinfected",
            Reason::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Reason {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Reason::ALL
            .iter()
            .copied()
            .find(|reason| reason.as_str() == wanted)
            .ok_or_else(|| anyhow::anyhow!("Unknown bounce reason '{}'", s))
    }
}

/// Pick the reason for a finalized record.
///
/// Rules are tried in table order and the first one whose predicate holds
/// wins. No match means [`Reason::Unknown`].
pub fn classify(record: &DeliveryStatusRecord, rules: &[ReasonRule]) -> Reason {
    match rules.iter().find(|rule| rule.predicate.matches(record)) {
        Some(rule) => {
            log::debug!(
                "Classified {} as {} (diagnosis: {})",
                record.recipient,
                rule.reason,
                record.diagnosis
            );
            rule.reason
        }
        None => Reason::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(reply_code: Option<u16>, command: &str, diagnosis: &str) -> DeliveryStatusRecord {
        DeliveryStatusRecord {
            recipient: "kijitora@example.jp".to_string(),
            command: command.to_string(),
            diagnosis: diagnosis.to_string(),
            reply_code,
            ..Default::default()
        }
    }

    #[test]
    fn test_reason_round_trips_through_strings() {
        for reason in Reason::ALL {
            assert_eq!(reason.as_str().parse::<Reason>().unwrap(), reason);
        }
        assert_eq!("NotAccept".parse::<Reason>().unwrap(), Reason::NotAccept);
        assert!("undefined-reason".parse::<Reason>().is_err());
    }

    #[test]
    fn test_reason_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Reason::MesgTooBig).unwrap(), "\"mesgtoobig\"");
        let reason: Reason = serde_yaml::from_str("notaccept").unwrap();
        assert_eq!(reason, Reason::NotAccept);
    }

    #[test]
    fn test_notaccept_excluded_by_reply_code() {
        let rules = catalog::rules().unwrap();
        for code in [521, 554, 556] {
            let reason = classify(
                &record(Some(code), "MAIL", "556 smtp protocol returned a permanent error"),
                &rules,
            );
            assert_ne!(reason, Reason::NotAccept, "reply code {code}");
        }
    }

    #[test]
    fn test_notaccept_without_reply_code() {
        let rules = catalog::rules().unwrap();
        let reason = classify(
            &record(None, "MAIL", "554 5.1.1 smtp protocol returned a permanent error"),
            &rules,
        );
        assert_eq!(reason, Reason::NotAccept);

        let reason = classify(
            &record(Some(550), "MAIL", "Name server: .: host not found"),
            &rules,
        );
        assert_eq!(reason, Reason::NotAccept);
    }

    #[test]
    fn test_notaccept_requires_mail_command() {
        let rules = catalog::rules().unwrap();
        let reason = classify(
            &record(None, "RCPT", "554 smtp protocol returned a permanent error"),
            &rules,
        );
        assert_ne!(reason, Reason::NotAccept);
    }

    #[test]
    fn test_expired_independent_of_command() {
        let rules = catalog::rules().unwrap();
        for (code, command) in [(None, ""), (Some(554), "RCPT"), (Some(421), "MAIL")] {
            let reason = classify(&record(code, command, "Delivery Retry Timeout Exceeded"), &rules);
            assert_eq!(reason, Reason::Expired);
        }
    }

    #[test]
    fn test_first_match_wins() {
        let rules = vec![
            ReasonRuleConfig {
                reason: Reason::Filtered,
                criteria: RuleCriteria::DiagnosisPattern {
                    pattern: "user unknown".to_string(),
                    case_insensitive: true,
                },
            }
            .compile()
            .unwrap(),
            ReasonRuleConfig {
                reason: Reason::UserUnknown,
                criteria: RuleCriteria::DiagnosisPattern {
                    pattern: "unknown".to_string(),
                    case_insensitive: true,
                },
            }
            .compile()
            .unwrap(),
        ];

        let reason = classify(&record(None, "RCPT", "5.1.1 User Unknown"), &rules);
        assert_eq!(reason, Reason::Filtered);
    }

    #[test]
    fn test_no_rule_yields_unknown() {
        assert_eq!(classify(&record(None, "", "whatever"), &[]), Reason::Unknown);

        let rules = catalog::rules().unwrap();
        let reason = classify(&record(None, "DATA", "the moon is in the wrong phase"), &rules);
        assert_eq!(reason, Reason::Unknown);
    }

    #[test]
    fn test_classify_is_repeatable() {
        let rules = catalog::rules().unwrap();
        let rec = record(None, "MAIL", "554 smtp protocol returned a permanent error");
        let first = classify(&rec, &rules);
        for _ in 0..10 {
            assert_eq!(classify(&rec, &rules), first);
        }
    }
}
