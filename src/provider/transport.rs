//! HTTP transport handed to the SDK client
//!
//! Custom headers are installed as reqwest default headers, so every request
//! carries them next to whatever the SDK adds itself (Authorization, api-key,
//! OpenAI-Organization). A custom header with one of those names is dropped
//! and the SDK value is sent alone.

use crate::config::Config;
use crate::error::{Error, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Parse `Key=Value` strings into a header map.
///
/// Splits on the first `=` and trims both halves. Entries without `=`, with an
/// empty key, or that are not valid HTTP header names or values are skipped.
/// Repeated keys keep every value.
pub fn parse_headers<S: AsRef<str>>(headers: &[S]) -> HeaderMap {
    let mut map = HeaderMap::new();

    for raw in headers {
        let Some((key, value)) = raw.as_ref().split_once('=') else {
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value.trim()),
        ) else {
            continue;
        };

        map.append(name, value);
    }

    map
}

/// Build the reqwest client for `config`: timeout, TLS verification, proxy
/// and custom headers.
///
/// Reqwest only adds a default header when the request does not already set
/// that name, so custom headers never override the SDK's auth headers.
pub fn build_http_client(config: &Config) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();

    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }

    if config.skip_verify {
        // Exposes the connection to MITM attacks. Development and testing only.
        tracing::warn!(target: "llm", "TLS certificate verification disabled");
        builder = builder.danger_accept_invalid_certs(true);
    }

    // An HTTP proxy wins over SOCKS5 when both are set.
    if let Some(proxy_url) = &config.proxy_url {
        builder = builder.proxy(proxy(proxy_url)?);
    } else if let Some(socks_url) = &config.socks_url {
        builder = builder.proxy(proxy(&socks5_url(socks_url))?);
    }

    let headers = parse_headers(&config.headers);
    if !headers.is_empty() {
        builder = builder.default_headers(headers);
    }

    Ok(builder.build()?)
}

fn proxy(url: &str) -> Result<reqwest::Proxy> {
    reqwest::Proxy::all(url).map_err(|source| Error::ProxyUnreachable {
        proxy: url.to_string(),
        source,
    })
}

/// SOCKS addresses may be given as a bare `host:port`.
fn socks5_url(address: &str) -> String {
    if address.contains("://") {
        address.to_string()
    } else {
        format!("socks5://{address}")
    }
}
