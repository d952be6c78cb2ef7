//! Turns a [`RawResponse`] into [`Metrics`] without ever failing.
//!
//! Header and body decoding report their outcome as enums so callers can see
//! what happened instead of a swallowed error.

use super::{RawResponse, CACHE_HEADER, CACHE_HIT_SENTINEL, USAGE_HEADER};
use crate::types::{Metrics, RateLimitState};
use log::debug;
use reqwest::header::HeaderMap;
use serde_json::Value;

/// Outcome of reading the usage header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageHeader {
    Points(i64),
    Missing,
    Malformed,
}

/// Outcome of decoding a response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Json(Value),
    NotJson,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub metrics: Metrics,
    pub body: Option<Value>,
    pub state: RateLimitState,
}

/// Read `points` out of the usage header.
///
/// A JSON object without a `points` member reports zero points. Anything that
/// is not a JSON object, or a `points` value that is not an integer, is
/// `Malformed`.
pub fn parse_usage_header(headers: &HeaderMap) -> UsageHeader {
    let Some(raw) = headers.get(USAGE_HEADER) else {
        return UsageHeader::Missing;
    };
    // Decode the raw bytes; `to_str` would reject any non-ASCII value.
    let Ok(Value::Object(obj)) = serde_json::from_slice::<Value>(raw.as_bytes()) else {
        return UsageHeader::Malformed;
    };
    match obj.get("points") {
        None => UsageHeader::Points(0),
        Some(v) => v.as_i64().map_or(UsageHeader::Malformed, UsageHeader::Points),
    }
}

pub fn parse_body(bytes: &[u8]) -> ParsedBody {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(v) => ParsedBody::Json(v),
        Err(_) => ParsedBody::NotJson,
    }
}

pub fn is_cache_hit(headers: &HeaderMap) -> bool {
    headers
        .get(CACHE_HEADER)
        .map(|v| v.as_bytes() == CACHE_HIT_SENTINEL.as_bytes())
        .unwrap_or(false)
}

pub fn normalize(response: RawResponse, prior: RateLimitState) -> Normalized {
    let state = match parse_usage_header(&response.headers) {
        UsageHeader::Points(points) => prior.with_points(points),
        UsageHeader::Missing => prior,
        UsageHeader::Malformed => {
            debug!("ignoring malformed {} header", USAGE_HEADER);
            prior
        }
    };

    let mut metrics = Metrics {
        status_code: response.status.as_u16(),
        response_time_secs: response.elapsed.as_secs_f64(),
        rate_limit_points: state.points_used,
        cache_hit: is_cache_hit(&response.headers),
        data_complete: false,
        error: None,
    };

    let body = match parse_body(&response.body) {
        ParsedBody::Json(value) => {
            metrics.error = value.as_object().and_then(|o| o.get("error")).cloned();
            metrics.data_complete = metrics.error.is_none();
            Some(value)
        }
        ParsedBody::NotJson => None,
    };

    Normalized {
        metrics,
        body,
        state,
    }
}
