// src/repository/proxy.rs

//! Environment proxy lookup
//!
//! Used when a repository has no explicit proxy. Follows the usual
//! `<scheme>_proxy` / `all_proxy` / `no_proxy` conventions, lower-case
//! variables taking precedence.

use reqwest::Url;
use std::env;

/// Proxy settings attached to a fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxySettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }
}

/// Look up the environment proxy for `url`
pub fn proxy_for(url: &str) -> Option<String> {
    proxy_for_with(url, |key| env::var(key).ok())
}

/// Look up the proxy for `url` using `lookup` to read variables
pub fn proxy_for_with<F>(url: &str, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let parsed = Url::parse(url).ok()?;
    let scheme = parsed.scheme().to_ascii_lowercase();
    let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();

    let var = |name: &str| -> Option<String> {
        lookup(name)
            .or_else(|| lookup(&name.to_ascii_uppercase()))
            .filter(|v| !v.trim().is_empty())
    };

    if let Some(no_proxy) = var("no_proxy")
        && bypasses_proxy(&host, &no_proxy)
    {
        return None;
    }

    var(&format!("{}_proxy", scheme)).or_else(|| var("all_proxy"))
}

/// Whether `host` matches an entry of a `no_proxy` list
fn bypasses_proxy(host: &str, no_proxy: &str) -> bool {
    no_proxy
        .split(',')
        .map(|entry| entry.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|entry| !entry.is_empty())
        .any(|entry| {
            entry == "*" || host == entry || host.ends_with(&format!(".{}", entry))
        })
}

/// Scheme of a URL (the part before the first `:`)
pub fn url_scheme(url: &str) -> &str {
    url.split(':').next().unwrap_or(url)
}
