pub mod normalize;

use crate::config::Config;
use crate::error::ProbeError;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};

pub use normalize::{normalize, parse_body, parse_usage_header, Normalized, ParsedBody, UsageHeader};

pub const USAGE_HEADER: &str = "x-business-use-case-usage";
pub const CACHE_HEADER: &str = "x-fb-debug-cache";
pub const CACHE_HIT_SENTINEL: &str = "1";

/// Query parameters (GET) or JSON body fields (POST).
pub type Params = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => f.write_str("GET"),
            HttpMethod::Post => f.write_str("POST"),
        }
    }
}

/// Everything the normalizer needs from one HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub elapsed: Duration,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

pub fn build_client(cfg: &Config) -> Result<Client, ProbeError> {
    let mut default_headers = HeaderMap::new();
    let ua = HeaderValue::from_str(&cfg.user_agent)
        .map_err(|e| ProbeError::InvalidConfig(format!("user agent: {e}")))?;
    default_headers.insert(USER_AGENT, ua);
    let mut builder = Client::builder()
        .default_headers(default_headers)
        .use_rustls_tls();
    if let Some(secs) = cfg.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder
        .build()
        .map_err(|e| ProbeError::InvalidConfig(format!("http client: {e}")))
}

fn auth_header(token: &str) -> Result<HeaderValue, ProbeError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| ProbeError::InvalidConfig("access token is not a valid header value".into()))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Render params as query pairs. Strings pass through as-is; every other
/// value (numbers, booleans, arrays, objects) is sent as its JSON text.
pub fn query_pairs(params: &Params) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(k, v)| {
            let rendered = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), rendered)
        })
        .collect()
}

/// Issues single requests against the configured Graph API base URL.
#[derive(Debug, Clone)]
pub struct Probe {
    client: Client,
    base_url: String,
    auth: HeaderValue,
}

impl Probe {
    pub fn new(cfg: &Config) -> Result<Self, ProbeError> {
        Ok(Self {
            client: build_client(cfg)?,
            base_url: cfg.api_url.clone(),
            auth: auth_header(&cfg.token)?,
        })
    }

    /// Send one request. `path` is appended verbatim to the base URL.
    ///
    /// No retries. A transport fault (DNS, refused connection, timeout, body
    /// read failure) comes back as [`ProbeError::Transport`]; any HTTP status,
    /// including 4xx and 5xx, is a successful exchange.
    pub async fn send(
        &self,
        path: &str,
        method: HttpMethod,
        params: Option<&Params>,
    ) -> Result<RawResponse, ProbeError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);
        let mut req = match method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
        }
        .header(AUTHORIZATION, self.auth.clone());
        req = match (method, params) {
            (HttpMethod::Get, Some(p)) => req.query(&query_pairs(p)),
            (HttpMethod::Post, Some(p)) => req.json(p),
            (_, None) => req,
        };

        let started = Instant::now();
        let res = req.send().await.map_err(|source| {
            debug!("{} {} failed: {}", method, url, source);
            ProbeError::Transport {
                url: url.clone(),
                source,
            }
        })?;
        let elapsed = started.elapsed();

        let status = res.status();
        let headers = res.headers().clone();
        let body = res.bytes().await.map_err(|source| {
            debug!("{} {} body read failed: {}", method, url, source);
            ProbeError::Transport {
                url: url.clone(),
                source,
            }
        })?;
        debug!("{} {} -> {} in {:?}", method, url, status, elapsed);
        Ok(RawResponse {
            status,
            elapsed,
            headers,
            body: body.to_vec(),
        })
    }
}
