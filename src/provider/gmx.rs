//! GMX (gmx.net / gmx.de) bounce reports.
//!
//! ```text
//! This message was created automatically by mail delivery software.
//!
//! A message that you sent could not be delivered to one or more of
//! its recipients. This is a permanent error. The following address
//! failed:
//!
//! "shironeko@example.jp":
//! SMTP error from remote server after RCPT command:
//! host: mx.example.jp
//! 5.1.1 <shironeko@example.jp>... User Unknown
//! ```
//!
//! Timeouts come as a bare angle-bracket address followed by `Reason:` and
//! the reason text on its own line.

use crate::pattern_set::{FieldConfig, MarkerConfig, PatternSet, PatternSetConfig, Signature};
use crate::reason::{Reason, ReasonRuleConfig, RuleCriteria};

pub const NAME: &str = "DE::GMX";

pub fn config() -> PatternSetConfig {
    PatternSetConfig {
        name: NAME.to_string(),
        description: "GMX: http://www.gmx.net".to_string(),
        enabled: true,
        // Envelope-To: <kijitora@mail.example.com>
        // X-GMX-Antispam: 0 (Mail was not recognized as spam); Detail=V3;
        signature: Signature::HeaderPresent {
            header: "x-gmx-antispam".to_string(),
        },
        markers: MarkerConfig {
            begin: r"^This message was created automatically by mail delivery software".to_string(),
            rfc822: r"^--- The header of the original message is following".to_string(),
            end: Some(r"^__END_OF_EMAIL_MESSAGE__$".to_string()),
        },
        fields: FieldConfig {
            recipient: vec![
                r#"^"([^ ]+@[^ ]+)":$"#.to_string(),
                r"^<([^ ]+@[^ ]+)>$".to_string(),
            ],
            command: r"^SMTP error .+ ([A-Z]{4}) command:$".to_string(),
            host: r"^host:[ \t]*(.+)$".to_string(),
            reason_label: r"^Reason:$".to_string(),
            diagnosis: vec![
                r"\b[45][.]\d[.]\d\b".to_string(),
                r"<[^ ]+@[^ ]+>".to_string(),
                r"\b[45]\d{2}\b".to_string(),
            ],
        },
        reasons: vec![ReasonRuleConfig {
            reason: Reason::Expired,
            criteria: RuleCriteria::DiagnosisPattern {
                pattern: r"delivery retry timeout exceeded".to_string(),
                case_insensitive: true,
            },
        }],
        inherit_catalog: true,
    }
}

pub fn pattern_set() -> anyhow::Result<PatternSet> {
    config().compile()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_compiles() {
        let set = pattern_set().unwrap();
        assert_eq!(set.name, NAME);
        assert_eq!(set.reason_rules[0].reason, Reason::Expired);
        assert!(set.markers.end.is_some());
    }

    #[test]
    fn test_recipient_forms() {
        let set = pattern_set().unwrap();
        let matches = |line: &str| set.fields.recipient.iter().any(|re| re.is_match(line));

        assert!(matches(r#""shironeko@example.jp":"#));
        assert!(matches("<kijitora@6jo.example.co.jp>"));
        assert!(!matches("shironeko@example.jp"));
        assert!(!matches(r#""shiro neko@example.jp":"#));
        assert!(!matches("5.1.1 <shironeko@example.jp>... User Unknown"));
    }

    #[test]
    fn test_config_survives_yaml() {
        let yaml = serde_yaml::to_string(&config()).unwrap();
        let parsed: PatternSetConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.name, NAME);
        assert!(parsed.compile().is_ok());
    }

    #[test]
    fn test_signature_needs_antispam_header() {
        use crate::message::Headers;

        let set = pattern_set().unwrap();
        let bounce_lookalike: Headers = [
            ("From", "MAILER-DAEMON@gmx.net"),
            ("Subject", "Mail delivery failed: returning message to sender"),
        ]
        .into_iter()
        .collect();
        assert!(!set.matches_signature(&bounce_lookalike));

        let gmx: Headers = [("X-GMX-Antispam", "0 (Mail was not recognized as spam)")]
            .into_iter()
            .collect();
        assert!(set.matches_signature(&gmx));
    }
}
