//! First-party cookie scoping.
//!
//! Responses relayed from the upstream API carry `Set-Cookie` headers scoped
//! to the upstream host. They are rewritten to the registrable domain of the
//! host the visitor actually requested, or made host-only when that host has
//! no registrable domain. Only the `Domain` attribute is touched: the rest of
//! the header is relayed byte for byte.

use std::sync::Arc;

use cookie::Cookie;
use http::header::{HeaderMap, HeaderValue, SET_COOKIE};
use tracing::debug;

use crate::punycode;
use crate::resolver::SuffixResolver;

/// ASCII form of a cookie domain; `""` (host-only) if it cannot be encoded.
fn cookie_domain(domain: &str) -> String {
    punycode::to_ascii(domain).unwrap_or_else(|e| {
        debug!(domain, error = %e, "cookie domain not encodable, using host-only");
        String::new()
    })
}

/// Drop every `Domain` attribute of a raw `Set-Cookie` value and append
/// `Domain=<domain>` unless `domain` is empty.
///
/// The name/value pair and all other attributes are kept verbatim; blank
/// attributes (`a=1;;`) are skipped.
fn splice_domain(raw: &[u8], domain: &str) -> Vec<u8> {
    let mut segments = raw.split(|&b| b == b';');
    let mut out = Vec::with_capacity(raw.len() + domain.len() + 9);

    if let Some(pair) = segments.next() {
        out.extend_from_slice(pair);
    }

    for attr in segments {
        let name = attr
            .split(|&b| b == b'=')
            .next()
            .unwrap_or_default()
            .trim_ascii();
        if name.is_empty() || name.eq_ignore_ascii_case(b"domain") {
            continue;
        }
        out.push(b';');
        out.extend_from_slice(attr);
    }

    if !domain.is_empty() {
        out.extend_from_slice(b"; Domain=");
        out.extend_from_slice(domain.as_bytes());
    }

    out
}

/// Log values the `cookie` crate rejects; they are still relayed.
fn check_set_cookie(raw: &[u8]) {
    match std::str::from_utf8(raw) {
        Ok(s) => {
            if let Err(e) = Cookie::parse(s) {
                debug!(error = %e, "relaying unparsable Set-Cookie");
            }
        }
        Err(_) => debug!("relaying non-UTF-8 Set-Cookie"),
    }
}

/// Rewrite the `Domain` attribute of a single `Set-Cookie` value.
///
/// An empty `domain` removes the attribute; a Unicode one is punycoded.
/// Everything else in `raw` is kept as is, even if it does not parse.
pub fn rewrite_set_cookie(raw: &str, domain: &str) -> String {
    check_set_cookie(raw.as_bytes());
    let domain = cookie_domain(domain);
    String::from_utf8_lossy(&splice_domain(raw.as_bytes(), &domain)).into_owned()
}

/// Rewrite every `Set-Cookie` header in `headers`, keeping their order.
///
/// Values are handled as bytes, so non-UTF-8 headers are relayed too.
pub fn rewrite_set_cookie_headers(headers: &mut HeaderMap, domain: &str) {
    let domain = cookie_domain(domain);
    let set_cookies: Vec<HeaderValue> = headers.get_all(SET_COOKIE).iter().cloned().collect();

    headers.remove(SET_COOKIE);

    for value in set_cookies {
        check_set_cookie(value.as_bytes());
        match HeaderValue::from_bytes(&splice_domain(value.as_bytes(), &domain)) {
            Ok(rewritten) => {
                headers.append(SET_COOKIE, rewritten);
            }
            Err(e) => {
                debug!(error = %e, "Set-Cookie invalid after rewrite, relaying original");
                headers.append(SET_COOKIE, value);
            }
        }
    }
}

/// Keep only the `allowed` cookies of a request `Cookie` header.
///
/// Pairs that fail to parse are skipped. Returns `None` when nothing is left.
pub fn filter_cookie_header(raw: &str, allowed: &[&str]) -> Option<String> {
    let kept: Vec<String> = Cookie::split_parse(raw)
        .filter_map(|parsed| parsed.ok())
        .filter(|c| allowed.contains(&c.name()))
        .map(|c| format!("{}={}", c.name(), c.value()))
        .collect();

    if kept.is_empty() {
        None
    } else {
        Some(kept.join("; "))
    }
}

/// Scopes relayed cookies to the requested host's registrable domain.
#[derive(Clone)]
pub struct CookieDomainRewriter {
    resolver: Arc<SuffixResolver>,
}

impl CookieDomainRewriter {
    /// Create a rewriter backed by `resolver`.
    pub fn new(resolver: Arc<SuffixResolver>) -> Self {
        Self { resolver }
    }

    /// Rewrite the `Set-Cookie` headers of a response to `hostname`.
    ///
    /// Returns the ASCII domain the cookies were scoped to; empty means
    /// host-only.
    pub fn rewrite(&self, headers: &mut HeaderMap, hostname: &str) -> String {
        let domain = cookie_domain(&self.resolver.effective_tld_plus_one(hostname));
        rewrite_set_cookie_headers(headers, &domain);
        domain
    }
}
