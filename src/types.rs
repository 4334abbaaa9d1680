use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::punycode;

/// Breakdown of a hostname around its public suffix.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParsedDomain {
    /// Hostname as given
    pub input: String,
    /// Public suffix, e.g. `co.uk`
    pub tld: Option<String>,
    /// Label immediately left of the public suffix
    pub sld: Option<String>,
    /// Registrable domain (`sld.tld`)
    pub domain: Option<String>,
    /// Everything left of `domain`
    pub subdomain: Option<String>,
    /// Whether a rule of the suffix list matched
    pub listed: bool,
}

impl ParsedDomain {
    /// Result with every part unset.
    pub fn empty(input: impl Into<String>, listed: bool) -> Self {
        Self {
            input: input.into(),
            listed,
            ..Default::default()
        }
    }

    /// Copy of this result with punycoded labels converted back to Unicode.
    pub fn to_unicode(&self) -> Result<Self> {
        let convert = |part: &Option<String>| -> Result<Option<String>> {
            part.as_deref().map(punycode::to_unicode).transpose()
        };

        Ok(Self {
            input: self.input.clone(),
            tld: convert(&self.tld)?,
            sld: convert(&self.sld)?,
            domain: convert(&self.domain)?,
            subdomain: convert(&self.subdomain)?,
            listed: self.listed,
        })
    }
}

/// Rule matched for a hostname, with its markers decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundRule {
    /// Rule text as listed, e.g. `*.kawasaki.jp`
    pub rule: String,
    /// Rule without its `*.` or `!` marker, e.g. `kawasaki.jp`
    pub suffix: String,
    /// Rule started with `*.`
    pub wildcard: bool,
    /// Rule started with `!`
    pub exception: bool,
}

impl FoundRule {
    /// Decode a rule's markers.
    pub fn from_rule(rule: &str) -> Self {
        if let Some(suffix) = rule.strip_prefix("*.") {
            Self {
                rule: rule.to_string(),
                suffix: suffix.to_string(),
                wildcard: true,
                exception: false,
            }
        } else if let Some(suffix) = rule.strip_prefix('!') {
            Self {
                rule: rule.to_string(),
                suffix: suffix.to_string(),
                wildcard: false,
                exception: true,
            }
        } else {
            Self {
                rule: rule.to_string(),
                suffix: rule.to_string(),
                wildcard: false,
                exception: false,
            }
        }
    }
}

/// Snapshot of the rule cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that ran normalization and the trie search
    pub misses: u64,
    /// Entries currently cached
    pub entries: usize,
}
