//! Public Suffix List rule table.
//!
//! Rules are read from the PSL text format: one rule per line, `//` comments,
//! blank lines ignored, only the first whitespace-delimited token counts.
//! The `===BEGIN ICANN DOMAINS===` / `===BEGIN PRIVATE DOMAINS===` markers
//! assign each rule to its section.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DomainError, Result};
use crate::punycode;

/// Mozilla Public Suffix List snapshot packaged with the crate.
#[cfg(feature = "embedded-list")]
pub const EMBEDDED_LIST: &str = include_str!("../data/public_suffix_list.dat");

/// Section of the list a rule was declared in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    /// Delegated by ICANN registries
    Icann,
    /// Submitted by private parties (e.g. `github.io`)
    Private,
}

/// A single suffix rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixRule {
    /// Rule text as listed, e.g. `co.uk`, `*.kawasaki.jp`, `!city.kawasaki.jp`
    pub suffix: String,
    /// ASCII form of the rule with its labels reversed, e.g. `jp.kawasaki.!city`
    pub reversed: String,
    /// Section the rule belongs to
    pub section: Section,
}

impl SuffixRule {
    /// Create a rule from its list text.
    pub fn new(suffix: &str, section: Section) -> Result<Self> {
        let suffix = suffix.to_lowercase();
        check_rule(&suffix)?;

        let ascii = punycode::to_ascii(&suffix)?;
        let reversed = ascii.rsplit('.').collect::<Vec<_>>().join(".");

        Ok(Self {
            suffix,
            reversed,
            section,
        })
    }

    /// `*.` rules match any single label in the leftmost position.
    pub fn is_wildcard(&self) -> bool {
        self.suffix.starts_with("*.")
    }

    /// `!` rules carve a name out of a wildcard rule.
    pub fn is_exception(&self) -> bool {
        self.suffix.starts_with('!')
    }
}

/// Reject rules with empty labels or misplaced markers.
fn check_rule(rule: &str) -> Result<()> {
    let body = rule.strip_prefix('!').unwrap_or(rule);

    for (i, label) in body.split('.').enumerate() {
        if label.is_empty() {
            return Err(DomainError::RuleList(format!("empty label in rule: {}", rule)));
        }
        if label.contains('!') || (label.contains('*') && (i > 0 || label != "*")) {
            return Err(DomainError::RuleList(format!(
                "misplaced marker in rule: {}",
                rule
            )));
        }
    }

    if rule.starts_with('!') && body.starts_with('*') {
        return Err(DomainError::RuleList(format!(
            "exception rule cannot be a wildcard: {}",
            rule
        )));
    }

    Ok(())
}

/// Parse rules from PSL text.
///
/// Duplicate rules keep their first occurrence.
pub fn parse_list(text: &str) -> Result<Vec<SuffixRule>> {
    let mut rules = Vec::new();
    let mut seen = HashSet::new();
    let mut section = Section::Icann;

    for (line_num, line) in text.lines().enumerate() {
        let line = line.trim();

        if let Some(comment) = line.strip_prefix("//") {
            if comment.contains("===BEGIN ICANN DOMAINS===") {
                section = Section::Icann;
            } else if comment.contains("===BEGIN PRIVATE DOMAINS===") {
                section = Section::Private;
            }
            continue;
        }

        let Some(token) = line.split_whitespace().next() else {
            continue;
        };

        let rule = SuffixRule::new(token, section).map_err(|e| {
            DomainError::RuleList(format!("line {}: {}", line_num + 1, e))
        })?;

        if seen.insert(rule.suffix.clone()) {
            rules.push(rule);
        }
    }

    if rules.is_empty() {
        return Err(DomainError::RuleList("no rules found".to_string()));
    }

    let private = rules
        .iter()
        .filter(|r| r.section == Section::Private)
        .count();
    debug!(
        rules = rules.len(),
        private, "parsed public suffix list"
    );

    Ok(rules)
}

/// Parse rules from a PSL file on disk.
pub fn parse_list_file(path: impl AsRef<Path>) -> Result<Vec<SuffixRule>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| {
        DomainError::RuleList(format!(
            "Failed to read rule list '{}': {}",
            path.display(),
            e
        ))
    })?;
    parse_list(&text)
}

/// Rules of the packaged list.
#[cfg(feature = "embedded-list")]
pub fn embedded_rules() -> Result<Vec<SuffixRule>> {
    parse_list(EMBEDDED_LIST)
}
