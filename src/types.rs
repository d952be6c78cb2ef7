use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_POINTS_TOTAL: i64 = 9000;
pub const DEFAULT_WINDOW_SECS: u64 = 300;

/// Last observed business-use-case usage.
///
/// `points_used` is overwritten from each decodable usage header, never
/// accumulated. `points_total` and `window_secs` are informational constants.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitState {
    pub points_used: i64,
    pub points_total: i64,
    pub window_secs: u64,
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self {
            points_used: 0,
            points_total: DEFAULT_POINTS_TOTAL,
            window_secs: DEFAULT_WINDOW_SECS,
        }
    }
}

impl RateLimitState {
    pub fn with_points(self, points_used: i64) -> Self {
        Self {
            points_used,
            ..self
        }
    }
}

// Per-call metrics; the decoded body is carried next to it, not inside.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Metrics {
    pub status_code: u16,
    pub response_time_secs: f64,
    pub rate_limit_points: i64,
    pub cache_hit: bool,
    pub data_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

/// Identifier pulled out of a listing response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    HasData(String),
    NoData,
}

impl Extracted {
    pub fn id(&self) -> Option<&str> {
        match self {
            Extracted::HasData(id) => Some(id),
            Extracted::NoData => None,
        }
    }
}
