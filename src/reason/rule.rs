use super::Reason;
use crate::delivery_status::DeliveryStatusRecord;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Reason rule as written in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasonRuleConfig {
    pub reason: Reason,
    pub criteria: RuleCriteria,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RuleCriteria {
    /// Reply code is one of `codes`. A missing reply code never matches.
    ReplyCodeIn { codes: Vec<u16> },
    /// Reply code is absent or not one of `codes`.
    ReplyCodeNotIn { codes: Vec<u16> },
    CommandIs { command: String },
    StatusPattern { pattern: String },
    DiagnosisPattern {
        pattern: String,
        #[serde(default = "default_case_insensitive")]
        case_insensitive: bool,
    },
    And { criteria: Vec<RuleCriteria> },
    Or { criteria: Vec<RuleCriteria> },
    Not { criteria: Box<RuleCriteria> },
}

fn default_case_insensitive() -> bool {
    true
}

/// Compiled form of [`RuleCriteria`].
#[derive(Debug, Clone)]
pub enum Predicate {
    ReplyCodeIn(Vec<u16>),
    ReplyCodeNotIn(Vec<u16>),
    CommandIs(String),
    Status(Regex),
    Diagnosis(Regex),
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn matches(&self, record: &DeliveryStatusRecord) -> bool {
        match self {
            Predicate::ReplyCodeIn(codes) => record
                .reply_code
                .map_or(false, |code| codes.contains(&code)),
            Predicate::ReplyCodeNotIn(codes) => record
                .reply_code
                .map_or(true, |code| !codes.contains(&code)),
            Predicate::CommandIs(command) => record.command.eq_ignore_ascii_case(command),
            Predicate::Status(regex) => !record.status.is_empty() && regex.is_match(&record.status),
            Predicate::Diagnosis(regex) => regex.is_match(&record.diagnosis),
            Predicate::All(predicates) => predicates.iter().all(|p| p.matches(record)),
            Predicate::Any(predicates) => predicates.iter().any(|p| p.matches(record)),
            Predicate::Not(predicate) => !predicate.matches(record),
        }
    }
}

impl RuleCriteria {
    pub fn compile(&self) -> anyhow::Result<Predicate> {
        Ok(match self {
            RuleCriteria::ReplyCodeIn { codes } => Predicate::ReplyCodeIn(codes.clone()),
            RuleCriteria::ReplyCodeNotIn { codes } => Predicate::ReplyCodeNotIn(codes.clone()),
            RuleCriteria::CommandIs { command } => Predicate::CommandIs(command.trim().to_string()),
            RuleCriteria::StatusPattern { pattern } => Predicate::Status(compile_regex(pattern, false)?),
            RuleCriteria::DiagnosisPattern {
                pattern,
                case_insensitive,
            } => Predicate::Diagnosis(compile_regex(pattern, *case_insensitive)?),
            RuleCriteria::And { criteria } => Predicate::All(
                criteria
                    .iter()
                    .map(RuleCriteria::compile)
                    .collect::<anyhow::Result<_>>()?,
            ),
            RuleCriteria::Or { criteria } => Predicate::Any(
                criteria
                    .iter()
                    .map(RuleCriteria::compile)
                    .collect::<anyhow::Result<_>>()?,
            ),
            RuleCriteria::Not { criteria } => Predicate::Not(Box::new(criteria.compile()?)),
        })
    }
}

fn compile_regex(pattern: &str, case_insensitive: bool) -> anyhow::Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| anyhow::anyhow!("Invalid regex pattern '{}': {}", pattern, e))
}

/// Compiled reason rule. Immutable once built.
#[derive(Debug, Clone)]
pub struct ReasonRule {
    pub reason: Reason,
    pub predicate: Predicate,
}

impl ReasonRuleConfig {
    pub fn compile(&self) -> anyhow::Result<ReasonRule> {
        let predicate = self
            .criteria
            .compile()
            .map_err(|e| anyhow::anyhow!("Rule for '{}': {}", self.reason, e))?;
        Ok(ReasonRule {
            reason: self.reason,
            predicate,
        })
    }
}
