//! Path matchers.
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Section matchers capture the remainder after `/<section>/`
//! - Alias matchers are exact lookups

use std::collections::HashMap;

/// Matches `/<section>` and `/<section>/<subpath>`, capturing `subpath`.
#[derive(Debug, Clone)]
pub struct SectionMatcher {
    section: String,
}

impl SectionMatcher {
    pub fn new(section: impl Into<String>) -> Self {
        let section = section.into();
        Self {
            section: format!("/{}", section.trim_matches('/')),
        }
    }

    /// The captured subpath (without leading slash), empty for the bare section.
    pub fn capture<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.section.as_str())?;
        if rest.is_empty() {
            return Some("");
        }
        rest.strip_prefix('/')
    }
}

/// Exact path → canonical asset name.
#[derive(Debug, Clone, Default)]
pub struct AliasMatcher {
    aliases: HashMap<String, &'static str>,
}

impl AliasMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alias(mut self, path: impl Into<String>, target: &'static str) -> Self {
        self.aliases.entry(path.into()).or_insert(target);
        self
    }

    pub fn lookup(&self, path: &str) -> Option<&'static str> {
        self.aliases.get(path).copied()
    }
}
