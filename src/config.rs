use crate::error::ProbeError;
use std::collections::BTreeSet;
use std::env;
use url::Url;

pub const TOKEN_VAR: &str = "META_ACCESS_TOKEN";
pub const DEFAULT_API_VERSION: &str = "v22.0";
pub const DEFAULT_GRAPH_HOST: &str = "https://graph.facebook.com";
pub const DEFAULT_REQUIRED_PERMISSIONS: &str = "ads_read";

/// Runtime configuration for the Graph API probe.
/// Values are sourced from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub api_url: String,
    pub api_version: String,
    pub user_agent: String,
    pub timeout_secs: Option<u64>,
    pub required_permissions: BTreeSet<String>,
}

impl Config {
    /// Load configuration from environment.
    ///
    /// Env vars:
    /// - META_ACCESS_TOKEN [required]
    /// - META_API_VERSION (default: v22.0)
    /// - META_API_URL (default: https://graph.facebook.com/<META_API_VERSION>)
    /// - META_HTTP_TIMEOUT_SECS (default: unset, transport default applies)
    /// - META_USER_AGENT (default: meta-ads-probe/<version>)
    /// - META_REQUIRED_PERMISSIONS (default: ads_read, comma separated)
    pub fn from_env() -> Result<Self, ProbeError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but reads values through `lookup`, which
    /// keeps tests away from the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ProbeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup(TOKEN_VAR)
            .filter(|t| !t.trim().is_empty())
            .ok_or(ProbeError::MissingToken(TOKEN_VAR))?;

        let api_version =
            lookup("META_API_VERSION").unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
        let api_url = lookup("META_API_URL")
            .unwrap_or_else(|| format!("{}/{}", DEFAULT_GRAPH_HOST, api_version));
        Url::parse(&api_url)
            .map_err(|e| ProbeError::InvalidConfig(format!("META_API_URL {api_url:?}: {e}")))?;
        let api_url = api_url.trim_end_matches('/').to_string();

        let timeout_secs = match lookup("META_HTTP_TIMEOUT_SECS") {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                ProbeError::InvalidConfig(format!("META_HTTP_TIMEOUT_SECS {raw:?} is not a number"))
            })?),
            None => None,
        };
        let user_agent = lookup("META_USER_AGENT")
            .unwrap_or_else(|| format!("meta-ads-probe/{}", env!("CARGO_PKG_VERSION")));
        let required_permissions = parse_permission_list(
            &lookup("META_REQUIRED_PERMISSIONS")
                .unwrap_or_else(|| DEFAULT_REQUIRED_PERMISSIONS.to_string()),
        );

        Ok(Self {
            token,
            api_url,
            api_version,
            user_agent,
            timeout_secs,
            required_permissions,
        })
    }
}

/// Split a comma separated scope list, dropping blanks and duplicates.
pub fn parse_permission_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
