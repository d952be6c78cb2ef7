use crate::error::ProbeError;
use crate::http::HttpMethod;
use crate::session::Session;
use log::info;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::io::Write;

pub const PERMISSIONS_PATH: &str = "/me/permissions";

#[derive(Debug, Deserialize)]
struct PermissionsBody {
    #[serde(default)]
    data: Vec<PermissionEntry>,
}

#[derive(Debug, Deserialize)]
struct PermissionEntry {
    permission: String,
    #[serde(default)]
    status: String,
}

/// Scopes whose status is `granted` in a `/me/permissions` body.
pub fn granted_permissions(body: &Value) -> Result<BTreeSet<String>, ProbeError> {
    let parsed = PermissionsBody::deserialize(body)
        .map_err(|e| ProbeError::PermissionCheck(format!("unexpected permissions payload: {e}")))?;
    Ok(parsed
        .data
        .into_iter()
        .filter(|p| p.status == "granted")
        .map(|p| p.permission)
        .collect())
}

pub fn missing_permissions(required: &BTreeSet<String>, granted: &BTreeSet<String>) -> Vec<String> {
    required.difference(granted).cloned().collect()
}

/// Pre-flight check run before the drill-down. Anything short of a decodable
/// permission list that covers `required` is fatal.
pub async fn validate_token<W: Write>(
    session: &mut Session<W>,
    required: &BTreeSet<String>,
) -> Result<BTreeSet<String>, ProbeError> {
    session.reporter_mut().line("\nValidating token permissions")?;
    let normalized = match session.call(PERMISSIONS_PATH, HttpMethod::Get, None).await {
        Ok(n) => n,
        Err(e) if e.is_transport() => return Err(ProbeError::PermissionCheck(e.to_string())),
        Err(e) => return Err(e),
    };
    if let Some(err) = &normalized.metrics.error {
        return Err(ProbeError::PermissionCheck(format!("API error: {}", err)));
    }
    let body = normalized
        .body
        .ok_or_else(|| ProbeError::PermissionCheck("response body was not JSON".into()))?;
    let granted = granted_permissions(&body)?;
    let missing = missing_permissions(required, &granted);
    if !missing.is_empty() {
        return Err(ProbeError::MissingPermissions(missing));
    }
    info!(
        "token carries required permissions: {}",
        required.iter().cloned().collect::<Vec<_>>().join(", ")
    );
    Ok(granted)
}
