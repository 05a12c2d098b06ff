//! Per-provider pattern sets.
//!
//! A pattern set is declared as plain data ([`PatternSetConfig`], usually
//! YAML) and compiled once into a [`PatternSet`]. The compiled value is
//! immutable and can be shared by reference between any number of parsers.

use crate::delivery_status::DeliveryStatusRecord;
use crate::message::Headers;
use crate::reason::{self, catalog, Reason, ReasonRule, ReasonRuleConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternSetConfig {
    /// Agent identifier stamped on every record, e.g. `DE::GMX`.
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub signature: Signature,
    pub markers: MarkerConfig,
    pub fields: FieldConfig,
    #[serde(default)]
    pub reasons: Vec<ReasonRuleConfig>,
    /// Append the generic reason catalog after `reasons`.
    #[serde(default = "default_true")]
    pub inherit_catalog: bool,
}

fn default_true() -> bool {
    true
}

/// Header test deciding whether a message belongs to a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Signature {
    HeaderPresent { header: String },
    HeaderPattern { header: String, pattern: String },
    And { criteria: Vec<Signature> },
    Or { criteria: Vec<Signature> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// Start of the delivery-status section.
    pub begin: String,
    /// Start of the original-message excerpt.
    pub rfc822: String,
    /// Stops parsing wherever it appears.
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Recipient line patterns; capture group 1 is the address.
    pub recipient: Vec<String>,
    /// Failed-command echo; capture group 1 is the SMTP verb.
    pub command: String,
    /// Remote host line; capture group 1 is the host.
    pub host: String,
    /// Bare label announcing that the reason text follows on the next line.
    pub reason_label: String,
    /// A line matching any of these is taken as the diagnosis.
    pub diagnosis: Vec<String>,
}

/// Compiled [`Signature`].
#[derive(Debug, Clone)]
pub enum SignatureMatcher {
    HeaderPresent(String),
    HeaderPattern(String, Regex),
    All(Vec<SignatureMatcher>),
    Any(Vec<SignatureMatcher>),
}

impl SignatureMatcher {
    pub fn matches(&self, headers: &Headers) -> bool {
        match self {
            SignatureMatcher::HeaderPresent(name) => headers.contains(name),
            SignatureMatcher::HeaderPattern(name, regex) => headers
                .get_all(name)
                .iter()
                .any(|value| regex.is_match(value)),
            SignatureMatcher::All(matchers) => matchers.iter().all(|m| m.matches(headers)),
            SignatureMatcher::Any(matchers) => matchers.iter().any(|m| m.matches(headers)),
        }
    }
}

impl Signature {
    fn compile(&self) -> anyhow::Result<SignatureMatcher> {
        Ok(match self {
            Signature::HeaderPresent { header } => SignatureMatcher::HeaderPresent(header.to_lowercase()),
            Signature::HeaderPattern { header, pattern } => {
                SignatureMatcher::HeaderPattern(header.to_lowercase(), compile_regex(pattern)?)
            }
            Signature::And { criteria } => SignatureMatcher::All(
                criteria
                    .iter()
                    .map(Signature::compile)
                    .collect::<anyhow::Result<_>>()?,
            ),
            Signature::Or { criteria } => SignatureMatcher::Any(
                criteria
                    .iter()
                    .map(Signature::compile)
                    .collect::<anyhow::Result<_>>()?,
            ),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Markers {
    pub begin: Regex,
    pub rfc822: Regex,
    pub end: Option<Regex>,
}

#[derive(Debug, Clone)]
pub struct FieldPatterns {
    pub recipient: Vec<Regex>,
    pub command: Regex,
    pub host: Regex,
    pub reason_label: Regex,
    pub diagnosis: Vec<Regex>,
}

/// Immutable, compiled provider configuration.
#[derive(Debug, Clone)]
pub struct PatternSet {
    pub name: String,
    pub description: String,
    pub signature: SignatureMatcher,
    pub markers: Markers,
    pub fields: FieldPatterns,
    /// Provider rules followed by the catalog, in classification order.
    pub reason_rules: Vec<ReasonRule>,
}

fn compile_regex(pattern: &str) -> anyhow::Result<Regex> {
    Regex::new(pattern).map_err(|e| anyhow::anyhow!("Invalid regex pattern '{}': {}", pattern, e))
}

fn compile_all(patterns: &[String]) -> anyhow::Result<Vec<Regex>> {
    patterns.iter().map(|p| compile_regex(p)).collect()
}

impl PatternSetConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PatternSetConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn compile(&self) -> anyhow::Result<PatternSet> {
        self.compile_inner()
            .map_err(|e| anyhow::anyhow!("Pattern set '{}': {}", self.name, e))
    }

    fn compile_inner(&self) -> anyhow::Result<PatternSet> {
        if self.fields.recipient.is_empty() {
            anyhow::bail!("at least one recipient pattern is required");
        }

        let mut reason_rules = self
            .reasons
            .iter()
            .map(ReasonRuleConfig::compile)
            .collect::<anyhow::Result<Vec<_>>>()?;
        if self.inherit_catalog {
            reason_rules.extend(catalog::rules()?);
        }

        Ok(PatternSet {
            name: self.name.clone(),
            description: self.description.clone(),
            signature: self.signature.compile()?,
            markers: Markers {
                begin: compile_regex(&self.markers.begin)?,
                rfc822: compile_regex(&self.markers.rfc822)?,
                end: self.markers.end.as_deref().map(compile_regex).transpose()?,
            },
            fields: FieldPatterns {
                recipient: compile_all(&self.fields.recipient)?,
                command: compile_regex(&self.fields.command)?,
                host: compile_regex(&self.fields.host)?,
                reason_label: compile_regex(&self.fields.reason_label)?,
                diagnosis: compile_all(&self.fields.diagnosis)?,
            },
            reason_rules,
        })
    }
}

impl PatternSet {
    pub fn matches_signature(&self, headers: &Headers) -> bool {
        self.signature.matches(headers)
    }

    /// Classify a finalized record against this set's rule table.
    pub fn classify(&self, record: &DeliveryStatusRecord) -> Reason {
        reason::classify(record, &self.reason_rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reason::Reason;

    const SAMPLE: &str = include_str!("../patterns/sample-provider.yaml");

    #[test]
    fn test_sample_module_compiles() {
        let config: PatternSetConfig = serde_yaml::from_str(SAMPLE).unwrap();
        let set = config.compile().unwrap();

        assert_eq!(set.name, "Example::Relay");
        assert!(set.fields.recipient.len() >= 1);
        assert!(set.markers.end.is_none());
        // Provider rules come first, then the catalog.
        assert_eq!(set.reason_rules[0].reason, Reason::Filtered);
        assert!(set.reason_rules.len() > catalog::configs().len());
    }

    #[test]
    fn test_signature_matching() {
        let signature = Signature::And {
            criteria: vec![
                Signature::HeaderPresent {
                    header: "X-GMX-Antispam".to_string(),
                },
                Signature::Or {
                    criteria: vec![
                        Signature::HeaderPattern {
                            header: "From".to_string(),
                            pattern: "^MAILER-DAEMON@".to_string(),
                        },
                        Signature::HeaderPattern {
                            header: "Received".to_string(),
                            pattern: r"gmx\.net".to_string(),
                        },
                    ],
                },
            ],
        }
        .compile()
        .unwrap();

        let headers: Headers = [
            ("x-gmx-antispam", "0"),
            ("received", "from mx.example.jp"),
            ("received", "from mout.gmx.net"),
        ]
        .into_iter()
        .collect();
        assert!(signature.matches(&headers));

        let headers: Headers = [("received", "from mout.gmx.net")].into_iter().collect();
        assert!(!signature.matches(&headers));
    }

    #[test]
    fn test_invalid_marker_names_the_pattern_set() {
        let mut config: PatternSetConfig = serde_yaml::from_str(SAMPLE).unwrap();
        config.markers.begin = "[broken".to_string();

        let message = config.compile().unwrap_err().to_string();
        assert!(message.contains("Example::Relay"));
        assert!(message.contains("[broken"));
    }

    #[test]
    fn test_recipient_patterns_required() {
        let mut config: PatternSetConfig = serde_yaml::from_str(SAMPLE).unwrap();
        config.fields.recipient.clear();
        assert!(config.compile().is_err());
    }
}
