// Per-request identity rotation: user agent, accept-language and proxy

use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA, REFERER, USER_AGENT,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;

pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 11_0_0) AppleWebKit/604.1.38 (KHTML, like Gecko) Version/14.0 Safari/604.1.38",
];

pub const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-GB,en-US;q=0.9,en;q=0.8",
    "en-US,en;q=0.9,fr;q=0.7",
];

const ACCEPT_VALUE: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// A proxy endpoint handed out by the rotator.
///
/// `slot` is the position of the proxy in the configured pool, which the
/// prober uses to pick the matching pre-built client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub slot: usize,
    pub uri: String,
}

/// A fixed pool walked round-robin through an atomic cursor.
#[derive(Debug)]
struct Rotation<T> {
    items: Vec<T>,
    cursor: AtomicUsize,
}

impl<T> Rotation<T> {
    fn new(items: Vec<T>) -> Self {
        Self {
            items,
            cursor: AtomicUsize::new(0),
        }
    }

    fn next(&self) -> Option<&T> {
        if self.items.is_empty() {
            return None;
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.items.len();
        self.items.get(idx)
    }
}

/// Hands out one user agent, one accept-language and (optionally) one proxy
/// per outbound request. Shared by every worker of a scan.
#[derive(Debug)]
pub struct IdentityRotator {
    referer: Option<HeaderValue>,
    user_agents: Rotation<HeaderValue>,
    languages: Rotation<HeaderValue>,
    proxies: Rotation<ProxyConfig>,
}

impl IdentityRotator {
    pub fn new(referer: &str) -> Self {
        Self::with_proxies(referer, Vec::new())
    }

    pub fn with_proxies(referer: &str, proxies: Vec<String>) -> Self {
        let referer = match HeaderValue::from_str(referer) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Referer '{}' is not a valid header value: {}", referer, e);
                None
            }
        };

        let proxies = proxies
            .into_iter()
            .enumerate()
            .map(|(slot, uri)| ProxyConfig { slot, uri })
            .collect();

        Self {
            referer,
            user_agents: Rotation::new(
                USER_AGENTS.iter().map(|ua| HeaderValue::from_static(ua)).collect(),
            ),
            languages: Rotation::new(
                ACCEPT_LANGUAGES
                    .iter()
                    .map(|lang| HeaderValue::from_static(lang))
                    .collect(),
            ),
            proxies: Rotation::new(proxies),
        }
    }

    /// Build the header set for the next request, advancing both header pools.
    pub fn next_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(ua) = self.user_agents.next() {
            headers.insert(USER_AGENT, ua.clone());
        }
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
        if let Some(lang) = self.languages.next() {
            headers.insert(ACCEPT_LANGUAGE, lang.clone());
        }
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        if let Some(ref referer) = self.referer {
            headers.insert(REFERER, referer.clone());
        }
        headers
    }

    /// Next proxy in the pool, or `None` when no proxies are configured.
    pub fn next_proxy(&self) -> Option<ProxyConfig> {
        self.proxies.next().cloned()
    }

    pub fn proxies(&self) -> &[ProxyConfig] {
        &self.proxies.items
    }
}

/// Split a comma-separated proxy list, dropping blank entries.
pub fn parse_proxy_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}
