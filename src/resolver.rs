//! Registrable domain resolution.
//!
//! [`SuffixResolver`] owns the suffix trie and a cache of rule lookups keyed
//! by the hostname exactly as given. Parsing lowercases, validates, finds the
//! prevailing rule and splits the hostname into suffix, registrable label and
//! subdomain.

use std::num::NonZeroUsize;
use std::path::Path;

use lru::LruCache;
#[cfg(feature = "embedded-list")]
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::Result;
use crate::punycode;
use crate::rules::{self, Section, SuffixRule};
use crate::trie::{reverse_labels, SuffixTrie};
use crate::types::{CacheStats, FoundRule, ParsedDomain};
use crate::validate::{validate, ValidationPolicy};

/// Resolver options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverOptions {
    /// Bound on cached rule lookups (LRU); `None` keeps every entry
    pub cache_size: Option<usize>,
    /// Whether rules from the PRIVATE section of the list apply
    pub include_private: bool,
    /// Hostname validation applied by `parse`
    pub validation: ValidationPolicy,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            cache_size: None,
            include_private: true,
            validation: ValidationPolicy::Relaxed,
        }
    }
}

impl ResolverOptions {
    /// Create new resolver options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the rule cache to `size` entries.
    pub fn with_cache_size(mut self, size: usize) -> Self {
        self.cache_size = Some(size);
        self
    }

    /// Include or skip PRIVATE section rules.
    pub fn with_private_domains(mut self, include: bool) -> Self {
        self.include_private = include;
        self
    }

    /// Set the validation policy.
    pub fn with_validation(mut self, policy: ValidationPolicy) -> Self {
        self.validation = policy;
        self
    }
}

/// Cached rule lookups with hit/miss counters
struct RuleCache {
    entries: LruCache<String, Option<FoundRule>>,
    hits: u64,
    misses: u64,
}

impl RuleCache {
    fn new(size: Option<usize>) -> Self {
        let entries = match size {
            Some(size) => LruCache::new(NonZeroUsize::new(size).unwrap_or(NonZeroUsize::MIN)),
            None => LruCache::unbounded(),
        };
        Self {
            entries,
            hits: 0,
            misses: 0,
        }
    }
}

/// Public suffix resolver.
pub struct SuffixResolver {
    trie: SuffixTrie,
    validation: ValidationPolicy,
    cache: Mutex<RuleCache>,
}

impl SuffixResolver {
    /// Create a resolver from a rule table.
    pub fn new(rules: &[SuffixRule], options: ResolverOptions) -> Self {
        let include_private = options.include_private;
        let trie = SuffixTrie::build(
            rules
                .iter()
                .filter(|r| include_private || r.section == Section::Icann),
        );

        debug!(
            rules = trie.len(),
            nodes = trie.node_count(),
            include_private,
            "built suffix trie"
        );

        Self {
            trie,
            validation: options.validation,
            cache: Mutex::new(RuleCache::new(options.cache_size)),
        }
    }

    /// Create a resolver from PSL text.
    pub fn from_list(text: &str, options: ResolverOptions) -> Result<Self> {
        let rules = rules::parse_list(text)?;
        Ok(Self::new(&rules, options))
    }

    /// Create a resolver from a PSL file.
    pub fn from_file(path: impl AsRef<Path>, options: ResolverOptions) -> Result<Self> {
        let rules = rules::parse_list_file(path)?;
        Ok(Self::new(&rules, options))
    }

    /// Create a resolver from the packaged list.
    #[cfg(feature = "embedded-list")]
    pub fn embedded(options: ResolverOptions) -> Result<Self> {
        Self::from_list(rules::EMBEDDED_LIST, options)
    }

    /// Find the prevailing rule for `domain`.
    ///
    /// Results, including "no rule", are cached under `domain` as given.
    pub fn find_rule(&self, domain: &str) -> Result<Option<FoundRule>> {
        let mut cache = self.cache.lock();

        if let Some(cached) = cache.entries.get(domain).cloned() {
            cache.hits += 1;
            trace!(domain, "rule cache hit");
            return Ok(cached);
        }

        // Cache miss: compute while holding the lock
        cache.misses += 1;
        trace!(domain, "rule cache miss");

        let found = self.lookup(domain)?;
        cache.entries.put(domain.to_string(), found.clone());

        Ok(found)
    }

    /// Normalize, reverse and search without touching the cache
    fn lookup(&self, domain: &str) -> Result<Option<FoundRule>> {
        let ascii = punycode::to_ascii(domain)?;
        Ok(self
            .trie
            .search(&reverse_labels(&ascii))
            .map(FoundRule::from_rule))
    }

    /// Split `input` into public suffix, registrable label and subdomain.
    ///
    /// Fails when the hostname does not pass validation. A hostname no rule
    /// matches is not an error: it is split on its last two labels and
    /// reported with `listed: false`.
    pub fn parse(&self, input: &str) -> Result<ParsedDomain> {
        let domain = punycode::map_separators(&input.to_lowercase());
        validate(&domain, self.validation)?;

        let mut labels: Vec<&str> = domain.split('.').collect();

        let Some(rule) = self.find_rule(&domain)? else {
            if labels.len() < 2 {
                return Ok(ParsedDomain::empty(input, false));
            }

            let mut parsed = ParsedDomain::empty(input, false);
            let tld = labels.pop().unwrap_or_default();
            let sld = labels.pop().unwrap_or_default();
            parsed.tld = Some(tld.to_string());
            parsed.sld = Some(sld.to_string());
            parsed.domain = Some(format!("{}.{}", sld, tld));
            if !labels.is_empty() {
                parsed.subdomain = Some(labels.join("."));
            }
            return finish_punycode(&domain, parsed);
        };

        let mut parsed = ParsedDomain::empty(input, true);

        // Suffix labels are taken from the hostname itself, so they keep the
        // hostname's encoding even when the rule is listed in Unicode.
        let suffix_len = rule.suffix.split('.').count();
        let mut private_parts = labels;
        let mut tld_parts = private_parts.split_off(private_parts.len().saturating_sub(suffix_len));

        if rule.exception && !tld_parts.is_empty() {
            private_parts.push(tld_parts.remove(0));
        }

        let mut tld = tld_parts.join(".");

        if private_parts.is_empty() {
            parsed.tld = Some(tld);
            return finish_punycode(&domain, parsed);
        }

        if rule.wildcard {
            if let Some(label) = private_parts.pop() {
                tld = format!("{}.{}", label, tld);
            }
        }

        if private_parts.is_empty() {
            parsed.tld = Some(tld);
            return finish_punycode(&domain, parsed);
        }

        let sld = private_parts.pop().unwrap_or_default();
        parsed.domain = Some(format!("{}.{}", sld, tld));
        parsed.sld = Some(sld.to_string());
        parsed.tld = Some(tld);
        if !private_parts.is_empty() {
            parsed.subdomain = Some(private_parts.join("."));
        }

        finish_punycode(&domain, parsed)
    }

    /// Registrable domain of `hostname`, or an empty string.
    ///
    /// Never fails: validation and encoding errors yield `""`, which leaves
    /// cookies host-only.
    pub fn effective_tld_plus_one(&self, hostname: &str) -> String {
        match self.parse(hostname) {
            Ok(parsed) => parsed.domain.unwrap_or_default(),
            Err(e) => {
                debug!(hostname, error = %e, "registrable domain resolution failed");
                String::new()
            }
        }
    }

    /// Registrable domain of `domain`, if any.
    pub fn get(&self, domain: &str) -> Option<String> {
        match self.parse(domain) {
            Ok(parsed) => parsed.domain,
            Err(e) => {
                debug!(domain, error = %e, "registrable domain lookup failed");
                None
            }
        }
    }

    /// Check if `domain` has a registrable domain under a listed suffix.
    pub fn is_valid(&self, domain: &str) -> bool {
        match self.parse(domain) {
            Ok(parsed) => parsed.listed && parsed.domain.is_some(),
            Err(e) => {
                debug!(domain, error = %e, "domain validity check failed");
                false
            }
        }
    }

    /// Number of rules indexed.
    pub fn rule_count(&self) -> usize {
        self.trie.len()
    }

    /// Snapshot of the rule cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        let cache = self.cache.lock();
        CacheStats {
            hits: cache.hits,
            misses: cache.misses,
            entries: cache.entries.len(),
        }
    }

    /// Clear the cache and reset its hit/miss counters.
    pub fn clear_cache(&self) {
        let mut cache = self.cache.lock();
        cache.entries.clear();
        cache.hits = 0;
        cache.misses = 0;
    }
}

/// Hostnames given in ACE form get their domain and subdomain back in ACE form.
fn finish_punycode(domain: &str, mut parsed: ParsedDomain) -> Result<ParsedDomain> {
    if !domain.contains(punycode::ACE_PREFIX) {
        return Ok(parsed);
    }
    if let Some(registrable) = parsed.domain.take() {
        parsed.domain = Some(punycode::to_ascii(&registrable)?);
    }
    if let Some(subdomain) = parsed.subdomain.take() {
        parsed.subdomain = Some(punycode::to_ascii(&subdomain)?);
    }
    Ok(parsed)
}

#[cfg(feature = "embedded-list")]
static DEFAULT_RESOLVER: Lazy<SuffixResolver> = Lazy::new(|| {
    SuffixResolver::embedded(ResolverOptions::default())
        .expect("EMBEDDED_LIST: packaged suffix list is invalid")
});

/// Process-wide resolver over the packaged list, built on first use.
#[cfg(feature = "embedded-list")]
pub fn default_resolver() -> &'static SuffixResolver {
    &DEFAULT_RESOLVER
}

/// [`SuffixResolver::parse`] on the default resolver.
#[cfg(feature = "embedded-list")]
pub fn parse(domain: &str) -> Result<ParsedDomain> {
    default_resolver().parse(domain)
}

/// [`SuffixResolver::effective_tld_plus_one`] on the default resolver.
#[cfg(feature = "embedded-list")]
pub fn get_effective_tld_plus_one(hostname: &str) -> String {
    default_resolver().effective_tld_plus_one(hostname)
}

/// [`SuffixResolver::get`] on the default resolver.
#[cfg(feature = "embedded-list")]
pub fn get(domain: &str) -> Option<String> {
    default_resolver().get(domain)
}

/// [`SuffixResolver::is_valid`] on the default resolver.
#[cfg(feature = "embedded-list")]
pub fn is_valid(domain: &str) -> bool {
    default_resolver().is_valid(domain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainError, ValidationErrorCode};
    use std::io;
    use std::sync::Arc;

    const LIST: &str = "\
// ===BEGIN ICANN DOMAINS===
com
uk
co.uk
jp
*.kawasaki.jp
!city.kawasaki.jp
中国
// ===END ICANN DOMAINS===
// ===BEGIN PRIVATE DOMAINS===
github.io
*.compute.amazonaws.com
// ===END PRIVATE DOMAINS===
";

    fn resolver() -> SuffixResolver {
        SuffixResolver::from_list(LIST, ResolverOptions::default()).unwrap()
    }

    #[test]
    fn test_parse_listed() {
        let parsed = resolver().parse("www.Example.CO.uk").unwrap();
        assert_eq!(parsed.input, "www.Example.CO.uk");
        assert_eq!(parsed.tld.as_deref(), Some("co.uk"));
        assert_eq!(parsed.sld.as_deref(), Some("example"));
        assert_eq!(parsed.domain.as_deref(), Some("example.co.uk"));
        assert_eq!(parsed.subdomain.as_deref(), Some("www"));
        assert!(parsed.listed);
    }

    #[test]
    fn test_parse_deep_subdomain() {
        let parsed = resolver().parse("a.b.c.example.com").unwrap();
        assert_eq!(parsed.domain.as_deref(), Some("example.com"));
        assert_eq!(parsed.subdomain.as_deref(), Some("a.b.c"));
    }

    #[test]
    fn test_parse_public_suffix_itself() {
        let parsed = resolver().parse("co.uk").unwrap();
        assert_eq!(parsed.tld.as_deref(), Some("co.uk"));
        assert_eq!(parsed.sld, None);
        assert_eq!(parsed.domain, None);
        assert!(parsed.listed);
    }

    #[test]
    fn test_parse_wildcard() {
        let r = resolver();

        let parsed = r.parse("foo.compute.amazonaws.com").unwrap();
        assert_eq!(parsed.tld.as_deref(), Some("foo.compute.amazonaws.com"));
        assert_eq!(parsed.domain, None);

        let parsed = r.parse("bar.foo.compute.amazonaws.com").unwrap();
        assert_eq!(parsed.tld.as_deref(), Some("foo.compute.amazonaws.com"));
        assert_eq!(parsed.sld.as_deref(), Some("bar"));
        assert_eq!(
            parsed.domain.as_deref(),
            Some("bar.foo.compute.amazonaws.com")
        );
    }

    #[test]
    fn test_parse_exception() {
        let r = resolver();

        let parsed = r.parse("city.kawasaki.jp").unwrap();
        assert_eq!(parsed.tld.as_deref(), Some("kawasaki.jp"));
        assert_eq!(parsed.sld.as_deref(), Some("city"));
        assert_eq!(parsed.domain.as_deref(), Some("city.kawasaki.jp"));

        let parsed = r.parse("www.city.kawasaki.jp").unwrap();
        assert_eq!(parsed.domain.as_deref(), Some("city.kawasaki.jp"));
        assert_eq!(parsed.subdomain.as_deref(), Some("www"));

        let parsed = r.parse("town.kawasaki.jp").unwrap();
        assert_eq!(parsed.tld.as_deref(), Some("town.kawasaki.jp"));
        assert_eq!(parsed.domain, None);
    }

    #[test]
    fn test_parse_unlisted() {
        let parsed = resolver().parse("www.foo.unknown-fake-tld-xyz123").unwrap();
        assert!(!parsed.listed);
        assert_eq!(parsed.tld.as_deref(), Some("unknown-fake-tld-xyz123"));
        assert_eq!(parsed.sld.as_deref(), Some("foo"));
        assert_eq!(parsed.domain.as_deref(), Some("foo.unknown-fake-tld-xyz123"));
        assert_eq!(parsed.subdomain.as_deref(), Some("www"));
    }

    #[test]
    fn test_parse_single_unlisted_label() {
        let parsed = resolver().parse("localhost").unwrap();
        assert_eq!(parsed, ParsedDomain::empty("localhost", false));
    }

    #[test]
    fn test_parse_rejects_empty_labels() {
        let err = resolver().parse("a..b").unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation {
                code: ValidationErrorCode::LabelTooShort,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_unicode_and_ace_inputs() {
        let r = resolver();

        let parsed = r.parse("foo.中国").unwrap();
        assert_eq!(parsed.tld.as_deref(), Some("中国"));
        assert_eq!(parsed.domain.as_deref(), Some("foo.中国"));

        let parsed = r.parse("foo.xn--fiqs8s").unwrap();
        assert_eq!(parsed.tld.as_deref(), Some("xn--fiqs8s"));
        assert_eq!(parsed.domain.as_deref(), Some("foo.xn--fiqs8s"));
        assert!(parsed.listed);
    }

    #[test]
    fn test_parse_mixed_input_returns_ace_domain() {
        let parsed = resolver().parse("www.例子.xn--fiqs8s").unwrap();
        assert_eq!(parsed.domain.as_deref(), Some("xn--fsqu00a.xn--fiqs8s"));
        assert_eq!(parsed.subdomain.as_deref(), Some("www"));
    }

    #[test]
    fn test_parse_ideographic_full_stop() {
        let parsed = resolver().parse("例子\u{3002}中国").unwrap();
        assert_eq!(parsed.domain.as_deref(), Some("例子.中国"));
    }

    #[test]
    fn test_find_rule_descriptor() {
        let r = resolver();
        let rule = r.find_rule("foo.kawasaki.jp").unwrap().unwrap();
        assert_eq!(rule.rule, "*.kawasaki.jp");
        assert_eq!(rule.suffix, "kawasaki.jp");
        assert!(rule.wildcard);

        assert_eq!(r.find_rule("example.org").unwrap(), None);
    }

    #[test]
    fn test_find_rule_is_memoized() {
        let r = resolver();

        let first = r.find_rule("www.example.com").unwrap();
        let second = r.find_rule("www.example.com").unwrap();
        assert_eq!(first, second);

        let stats = r.cache_stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_negative_lookups_are_cached() {
        let r = resolver();
        assert_eq!(r.find_rule("example.org").unwrap(), None);
        assert_eq!(r.find_rule("example.org").unwrap(), None);
        assert_eq!(r.cache_stats().misses, 1);
    }

    #[test]
    fn test_cache_keyed_by_raw_string() {
        let r = resolver();
        r.find_rule("example.com").unwrap();
        r.find_rule("EXAMPLE.com").unwrap();
        assert_eq!(r.cache_stats().misses, 2);
    }

    #[test]
    fn test_bounded_cache_evicts() {
        let options = ResolverOptions::new().with_cache_size(2);
        let r = SuffixResolver::from_list(LIST, options).unwrap();

        r.find_rule("a.com").unwrap();
        r.find_rule("b.com").unwrap();
        r.find_rule("c.com").unwrap();
        assert_eq!(r.cache_stats().entries, 2);

        // "a.com" was evicted
        r.find_rule("a.com").unwrap();
        assert_eq!(r.cache_stats().misses, 4);
    }

    #[test]
    fn test_clear_cache() {
        let r = resolver();
        r.find_rule("example.com").unwrap();
        r.find_rule("example.com").unwrap();
        r.clear_cache();
        assert_eq!(r.cache_stats(), CacheStats::default());

        r.find_rule("example.com").unwrap();
        let stats = r.cache_stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_private_rules_can_be_excluded() {
        let options = ResolverOptions::new().with_private_domains(false);
        let r = SuffixResolver::from_list(LIST, options).unwrap();

        assert_eq!(r.rule_count(), 7);
        // Falls back to the unlisted split
        let parsed = r.parse("user.github.io").unwrap();
        assert!(!parsed.listed);
        assert_eq!(parsed.domain.as_deref(), Some("github.io"));
    }

    #[test]
    fn test_strict_validation_policy() {
        let options = ResolverOptions::new().with_validation(ValidationPolicy::Strict);
        let r = SuffixResolver::from_list(LIST, options).unwrap();

        let err = r.parse("-bad.example.com").unwrap_err();
        assert_eq!(err.code(), Some(ValidationErrorCode::LabelStartsWithDash));
        assert_eq!(r.effective_tld_plus_one("-bad.example.com"), "");

        // Relaxed accepts the same name
        assert_eq!(
            resolver().effective_tld_plus_one("-bad.example.com"),
            "example.com"
        );
    }

    #[test]
    fn test_effective_tld_plus_one_never_fails() {
        let r = resolver();
        for input in ["", ".", "...", "a..b", ".com", "com.", "localhost"] {
            assert_eq!(r.effective_tld_plus_one(input), "", "input: {:?}", input);
        }
        assert_eq!(r.effective_tld_plus_one("www.example.com"), "example.com");
    }

    #[test]
    fn test_get_and_is_valid() {
        let r = resolver();
        assert_eq!(r.get("www.example.co.uk").as_deref(), Some("example.co.uk"));
        assert_eq!(r.get("co.uk"), None);
        assert_eq!(r.get("a..b"), None);

        assert!(r.is_valid("example.com"));
        assert!(!r.is_valid("com"));
        assert!(!r.is_valid("example.unknown-tld"));
        assert!(!r.is_valid(".example.com"));
    }

    /// Log sink shared between a test and its subscriber
    #[derive(Clone, Default)]
    struct LogCapture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_swallowed_errors_are_logged() {
        let capture = LogCapture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let r = resolver();
        tracing::subscriber::with_default(subscriber, || {
            assert_eq!(r.get("a..b"), None);
            assert!(!r.is_valid("a..b"));
            assert_eq!(r.effective_tld_plus_one("a..b"), "");
        });

        let logs = String::from_utf8_lossy(&capture.0.lock()).into_owned();
        assert!(logs.contains("registrable domain lookup failed"), "logs: {}", logs);
        assert!(logs.contains("domain validity check failed"), "logs: {}", logs);
        assert!(logs.contains("registrable domain resolution failed"), "logs: {}", logs);
        assert!(logs.contains("LABEL_TOO_SHORT"), "logs: {}", logs);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: ResolverOptions =
            serde_json::from_str(r#"{"cache_size": 128, "validation": "strict"}"#).unwrap();
        assert_eq!(options.cache_size, Some(128));
        assert!(options.include_private);
        assert_eq!(options.validation, ValidationPolicy::Strict);
    }

    #[test]
    fn test_resolver_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SuffixResolver>();
    }
}
