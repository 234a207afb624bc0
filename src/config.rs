// Upload configuration: the validated endpoint, extra request headers,
// per-request timeout and worker count. Built once before scanning so
// that a bad endpoint or header aborts the run up front.

use crate::error::{Error, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use url::Url;

pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub endpoint: Url,
    pub headers: HeaderMap,
    pub timeout: Duration,
    pub concurrency: usize,
}

impl UploadConfig {
    pub fn new(
        endpoint: &str,
        raw_headers: &[String],
        timeout_secs: u64,
        concurrency: usize,
    ) -> Result<Self> {
        if concurrency == 0 {
            return Err(Error::InvalidConcurrency);
        }
        if timeout_secs == 0 {
            return Err(Error::InvalidTimeout);
        }
        Ok(Self {
            endpoint: parse_endpoint(endpoint)?,
            headers: parse_headers(raw_headers)?,
            timeout: Duration::from_secs(timeout_secs),
            concurrency,
        })
    }
}

fn parse_endpoint(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|source| Error::InvalidEndpoint {
        url: raw.to_string(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::UnsupportedScheme {
            url: raw.to_string(),
            scheme: other.to_string(),
        }),
    }
}

/// Turn `key:value` strings into a header map.
///
/// The first colon splits key from value and both sides are trimmed. Entries
/// without a colon are skipped with a warning. A later entry with the same
/// key replaces the earlier one.
pub fn parse_headers(raw: &[String]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for entry in raw {
        let Some((key, value)) = entry.split_once(':') else {
            tracing::warn!("ignoring header without ':' separator: {:?}", entry);
            continue;
        };
        let name = HeaderName::from_bytes(key.trim().as_bytes()).map_err(|e| {
            Error::InvalidHeader {
                header: entry.clone(),
                reason: e.to_string(),
            }
        })?;
        let value = HeaderValue::from_str(value.trim()).map_err(|e| Error::InvalidHeader {
            header: entry.clone(),
            reason: e.to_string(),
        })?;
        headers.insert(name, value);
    }
    Ok(headers)
}
