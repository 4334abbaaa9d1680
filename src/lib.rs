//! eTLD Engine - Public Suffix List resolution for Rust
//!
//! This library computes the registrable domain (eTLD+1) of a hostname, the
//! way a first-party proxy needs it to scope relayed cookies:
//! - Public Suffix List parsing (ICANN and PRIVATE sections)
//! - Trie-based longest-match lookup with wildcard and exception rules
//! - Punycode (RFC 3492) and IDNA-style domain conversion
//! - Relaxed or strict hostname validation with psl error codes
//! - LRU caching of rule lookups
//! - `Set-Cookie` domain rewriting (feature `cookie`)
//!
//! # Example
//!
//! ```rust
//! use etld_engine::{parse, get_effective_tld_plus_one};
//!
//! let parsed = parse("www.example.co.uk").unwrap();
//! assert_eq!(parsed.tld.as_deref(), Some("co.uk"));
//! assert_eq!(parsed.sld.as_deref(), Some("example"));
//! assert_eq!(parsed.domain.as_deref(), Some("example.co.uk"));
//! assert_eq!(parsed.subdomain.as_deref(), Some("www"));
//!
//! // Errors never escape the cookie-facing wrapper
//! assert_eq!(get_effective_tld_plus_one("a..b"), "");
//! ```
//!
//! # Custom Lists
//!
//! ```rust
//! use etld_engine::{ResolverOptions, SuffixResolver};
//!
//! let list = "
//! // ===BEGIN ICANN DOMAINS===
//! com
//! *.kawasaki.jp
//! !city.kawasaki.jp
//! // ===END ICANN DOMAINS===
//! ";
//!
//! let resolver = SuffixResolver::from_list(list, ResolverOptions::new().with_cache_size(1024)).unwrap();
//! assert_eq!(resolver.get("city.kawasaki.jp").as_deref(), Some("city.kawasaki.jp"));
//! assert_eq!(resolver.get("www.town.kawasaki.jp").as_deref(), Some("www.town.kawasaki.jp"));
//! ```
//!
//! # Rule Syntax
//!
//! | Rule | Example | Meaning |
//! |------|---------|---------|
//! | Plain | `co.uk` | The name itself is a public suffix |
//! | Wildcard | `*.kawasaki.jp` | Any single label under the name is a public suffix |
//! | Exception | `!city.kawasaki.jp` | Carves a registrable name out of a wildcard |

#[cfg(feature = "cookie")]
pub mod cookie;
pub mod error;
pub mod punycode;
pub mod resolver;
pub mod rules;
pub mod trie;
pub mod types;
pub mod validate;

// Re-export commonly used items
pub use error::{DomainError, Result, ValidationErrorCode};
pub use rules::{parse_list, parse_list_file, Section, SuffixRule};
pub use trie::SuffixTrie;
pub use types::{CacheStats, FoundRule, ParsedDomain};
pub use validate::{validate, ValidationPolicy};

// Re-export resolver types
pub use resolver::{ResolverOptions, SuffixResolver};

#[cfg(feature = "embedded-list")]
pub use resolver::{default_resolver, get, get_effective_tld_plus_one, is_valid, parse};
#[cfg(feature = "embedded-list")]
pub use rules::EMBEDDED_LIST;

// Re-export cookie types
#[cfg(feature = "cookie")]
pub use self::cookie::{
    filter_cookie_header, rewrite_set_cookie, rewrite_set_cookie_headers, CookieDomainRewriter,
};
