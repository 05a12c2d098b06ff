//! Generic reason rules shared by every provider.
//!
//! Classification is first-match, so narrower rules sit above broader ones.
//! `userunknown` must stay below `hostunknown` and `mailboxfull`.

use super::rule::{ReasonRule, ReasonRuleConfig, RuleCriteria};
use super::Reason;

fn diagnosis(pattern: &str) -> RuleCriteria {
    RuleCriteria::DiagnosisPattern {
        pattern: pattern.to_string(),
        case_insensitive: true,
    }
}

fn diagnosis_or_status(pattern: &str, status: &str) -> RuleCriteria {
    RuleCriteria::Or {
        criteria: vec![
            diagnosis(pattern),
            RuleCriteria::StatusPattern {
                pattern: status.to_string(),
            },
        ],
    }
}

fn rule(reason: Reason, criteria: RuleCriteria) -> ReasonRuleConfig {
    ReasonRuleConfig { reason, criteria }
}

/// The catalog in priority order, as configuration.
pub fn configs() -> Vec<ReasonRuleConfig> {
    vec![
        rule(
            Reason::NotAccept,
            RuleCriteria::And {
                criteria: vec![
                    // 521/554/556 belong to more specific reasons
                    RuleCriteria::ReplyCodeNotIn {
                        codes: vec![521, 554, 556],
                    },
                    RuleCriteria::CommandIs {
                        command: "MAIL".to_string(),
                    },
                    diagnosis(
                        r"(?:name server: [.]: host not found|55[46](?: [245][.]\d{1,3}[.]\d{1,3})? smtp protocol returned a permanent error)",
                    ),
                ],
            },
        ),
        rule(
            Reason::Expired,
            diagnosis(
                r"(?:delivery retry timeout exceeded|retry time(?:out)? (?:exceeded|reached)|message expired|could not be delivered for \d+ days|queued too long)",
            ),
        ),
        rule(
            Reason::TooManyConn,
            diagnosis(r"(?:too many (?:simultaneous |concurrent )?connections|connection limit (?:exceeded|reached))"),
        ),
        rule(
            Reason::Blocked,
            diagnosis(
                r"(?:blacklisted|blocklisted|is listed (?:at|on|in) |blocked using |client host .+ blocked|banned sending ip)",
            ),
        ),
        rule(
            Reason::SpamDetected,
            diagnosis(r"(?:(?:detected|classified|identified|rejected) as spam|spam (?:detected|message rejected|content))"),
        ),
        rule(
            Reason::VirusInfected,
            diagnosis(r"(?:virus (?:detected|found)|infected with|contains? (?:a )?virus)"),
        ),
        rule(
            Reason::NoRelaying,
            diagnosis(r"(?:relay(?:ing)? (?:access )?denied|relaying (?:is )?not (?:allowed|permitted)|not permitted to relay|unable to relay)"),
        ),
        rule(
            Reason::MesgTooBig,
            diagnosis_or_status(
                r"(?:message (?:is )?too (?:large|big)|message size exceeds|exceeds? (?:the )?(?:maximum|fixed) (?:allowed )?(?:message )?size|size limit exceeded)",
                r"^5\.3\.4$",
            ),
        ),
        rule(
            Reason::MailboxFull,
            diagnosis_or_status(
                r"(?:mailbox (?:is )?full|over (?:the )?quota|quota exceeded|exceeded (?:storage|quota)|insufficient storage for (?:user|mailbox))",
                r"^[45]\.2\.2$",
            ),
        ),
        rule(
            Reason::Suspend,
            diagnosis(r"(?:mailbox (?:is )?(?:disabled|suspended|inactive)|account (?:has been )?(?:disabled|suspended|deactivated))"),
        ),
        rule(
            Reason::HasMoved,
            diagnosis(r"(?:user has moved|address has changed|mailbox has been moved)"),
        ),
        rule(
            Reason::HostUnknown,
            diagnosis_or_status(
                r"(?:host (?:or domain name )?not found|host unknown|unrouteable address|domain (?:does not exist|not found)|no such domain|name service error)",
                r"^5\.1\.2$",
            ),
        ),
        rule(
            Reason::UserUnknown,
            diagnosis_or_status(
                r"(?:user unknown|unknown user|no such (?:user|mailbox|recipient)|user (?:does not exist|not found)|mailbox (?:unavailable|not found|does not exist)|recipient (?:address )?rejected|invalid recipient)",
                r"^5\.1\.1$",
            ),
        ),
        rule(
            Reason::SystemFull,
            diagnosis(r"(?:mail system full|insufficient system storage|out of disk space)"),
        ),
        rule(
            Reason::SecurityError,
            diagnosis(r"(?:authentication (?:required|failed)|must issue a starttls|tls required|encryption required)"),
        ),
        rule(
            Reason::Rejected,
            diagnosis(r"(?:sender (?:address )?rejected|sender (?:is )?not (?:allowed|authorized)|domain of sender address .+ does not exist)"),
        ),
        rule(
            Reason::SystemError,
            diagnosis(r"(?:system error|local error in processing|internal server error|server configuration error|too many hops|mail loop detected)"),
        ),
    ]
}

/// The catalog compiled.
pub fn rules() -> anyhow::Result<Vec<ReasonRule>> {
    configs().iter().map(ReasonRuleConfig::compile).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery_status::DeliveryStatusRecord;
    use crate::reason::classify;

    fn classify_text(diagnosis: &str, status: &str) -> Reason {
        let rules = rules().unwrap();
        let record = DeliveryStatusRecord {
            recipient: "kijitora@example.jp".to_string(),
            command: "RCPT".to_string(),
            diagnosis: diagnosis.to_string(),
            status: status.to_string(),
            ..Default::default()
        };
        classify(&record, &rules)
    }

    #[test]
    fn test_catalog_compiles_in_declared_order() {
        let rules = rules().unwrap();
        let order: Vec<Reason> = rules.iter().map(|r| r.reason).collect();
        assert_eq!(order.first(), Some(&Reason::NotAccept));
        assert_eq!(order.get(1), Some(&Reason::Expired));
        assert_eq!(order.len(), configs().len());
    }

    #[test]
    fn test_common_diagnoses() {
        assert_eq!(classify_text("5.1.1 <shironeko@example.jp>... User Unknown", "5.1.1"), Reason::UserUnknown);
        assert_eq!(classify_text("552 5.2.2 Mailbox full", "5.2.2"), Reason::MailboxFull);
        assert_eq!(classify_text("550 Host unknown", ""), Reason::HostUnknown);
        assert_eq!(
            classify_text("554 5.7.1 Service unavailable; Client host [192.0.2.1] blocked using zen.spamhaus.org", "5.7.1"),
            Reason::Blocked
        );
        assert_eq!(classify_text("550 5.7.1 Relaying denied", "5.7.1"), Reason::NoRelaying);
        assert_eq!(classify_text("552 Message size exceeds fixed maximum message size", ""), Reason::MesgTooBig);
        assert_eq!(classify_text("421 Too many concurrent connections", ""), Reason::TooManyConn);
    }

    #[test]
    fn test_status_only_signal() {
        assert_eq!(classify_text("550 see status", "5.1.2"), Reason::HostUnknown);
        assert_eq!(classify_text("550 see status", "5.3.4"), Reason::MesgTooBig);
    }

    #[test]
    fn test_notaccept_with_enhanced_status_in_between() {
        let rules = rules().unwrap();
        let record = DeliveryStatusRecord {
            recipient: "kijitora@example.jp".to_string(),
            command: "MAIL".to_string(),
            diagnosis: "554 5.1.1 smtp protocol returned a permanent error".to_string(),
            status: "5.1.1".to_string(),
            ..Default::default()
        };
        assert_eq!(classify(&record, &rules), Reason::NotAccept);

        let record = DeliveryStatusRecord {
            diagnosis: "556 smtp protocol returned a permanent error".to_string(),
            status: String::new(),
            ..record
        };
        assert_eq!(classify(&record, &rules), Reason::NotAccept);
    }

    #[test]
    fn test_sender_rejection_is_not_user_unknown() {
        assert_eq!(classify_text("553 5.7.1 Sender address rejected", "5.7.1"), Reason::Rejected);
    }
}
