pub mod gmx;

use crate::config::{module_loader, Config};
use crate::delivery_status::BounceReport;
use crate::error::ParseError;
use crate::message::Headers;
use crate::pattern_set::PatternSet;
use crate::scanner;

/// A provider-specific bounce parser.
pub trait BounceParser: Send + Sync {
    /// Agent identifier, e.g. `DE::GMX`.
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn detect(&self, headers: &Headers) -> bool;
    /// `reply_code` is the SMTP reply code when the caller knows it from
    /// outside the body; it is never inferred from the text.
    fn parse(
        &self,
        headers: &Headers,
        body: &str,
        reply_code: Option<u16>,
    ) -> Result<BounceReport, ParseError>;
}

impl BounceParser for PatternSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn detect(&self, headers: &Headers) -> bool {
        self.matches_signature(headers)
    }

    fn parse(
        &self,
        headers: &Headers,
        body: &str,
        reply_code: Option<u16>,
    ) -> Result<BounceReport, ParseError> {
        scanner::scan_with_reply_code(self, headers, body, reply_code)
    }
}

/// Ordered set of parsers. The first one whose `detect` holds handles the
/// message.
pub struct Registry {
    parsers: Vec<Box<dyn BounceParser>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Registry holding only the compiled-in providers.
    pub fn builtin() -> anyhow::Result<Self> {
        let mut registry = Self::new();
        registry.register(Box::new(gmx::pattern_set()?));
        Ok(registry)
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut registry = if config.builtin_providers {
            Self::builtin()?
        } else {
            Self::new()
        };

        if let Some(dir) = config.pattern_dir.as_deref() {
            for set in module_loader::load_pattern_sets(dir)? {
                registry.register(Box::new(set));
            }
        }

        if registry.is_empty() {
            log::warn!("No bounce providers configured; every message will be unrecognized");
        }
        Ok(registry)
    }

    pub fn register(&mut self, parser: Box<dyn BounceParser>) {
        if self.get(parser.name()).is_some() {
            log::warn!("Provider {} registered twice; the first one wins", parser.name());
        }
        log::debug!("Registered bounce provider {}", parser.name());
        self.parsers.push(parser);
    }

    pub fn get(&self, name: &str) -> Option<&dyn BounceParser> {
        self.parsers
            .iter()
            .find(|p| p.name() == name)
            .map(|p| &**p)
    }

    pub fn select(&self, headers: &Headers) -> Option<&dyn BounceParser> {
        self.parsers
            .iter()
            .find(|p| p.detect(headers))
            .map(|p| &**p)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn BounceParser> {
        self.parsers.iter().map(|p| -> &dyn BounceParser { &**p })
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    /// Select a parser for the message and run it.
    pub fn process(
        &self,
        headers: &Headers,
        body: &str,
        reply_code: Option<u16>,
    ) -> Result<BounceReport, ParseError> {
        match self.select(headers) {
            Some(parser) => {
                log::debug!("Parsing message with {}", parser.name());
                parser.parse(headers, body, reply_code)
            }
            None => Err(ParseError::NotRecognized),
        }
    }
}
