use thiserror::Error;

/// Failures that abort a probe or the whole run.
///
/// Application-level errors returned by the Graph API (an `error` object in a
/// JSON body) are not represented here; they travel as data in
/// [`crate::types::Metrics::error`].
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("missing {0}; export an access token before running")]
    MissingToken(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("token is missing required permissions: {}", .0.join(", "))]
    MissingPermissions(Vec<String>),

    #[error("permission check failed: {0}")]
    PermissionCheck(String),

    #[error("failed to write report: {0}")]
    Report(#[from] std::io::Error),
}

impl ProbeError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ProbeError::Transport { .. })
    }
}
