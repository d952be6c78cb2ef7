//! Diagnostic probe for the Meta Marketing (Graph) API.
//!
//! Walks the account → campaign → ad set → ad → insights chain one request
//! at a time and reports, for every call, the status code, latency,
//! business-use-case rate-limit points, the cache-hit flag and whether the
//! body decoded cleanly.

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod http;
pub mod permissions;
pub mod report;
pub mod session;
pub mod types;

use crate::config::Config;
use crate::driver::{DrillDownOptions, DrillDownReport};
use crate::error::ProbeError;
use crate::http::Probe;
use crate::report::{ReportFormat, Reporter};
use crate::session::Session;
use std::io::Write;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub format: ReportFormat,
    pub drill_down: DrillDownOptions,
}

/// Full run: banner, permission pre-flight, then the drill-down.
///
/// Returns `Err` only for fatal conditions (pre-flight failure, unusable
/// configuration, report sink failure). Per-step failures are in the report.
pub async fn run<W: Write>(
    cfg: &Config,
    options: RunOptions,
    out: W,
) -> Result<DrillDownReport, ProbeError> {
    let probe = Probe::new(cfg)?;
    let mut session = Session::new(probe, Reporter::new(out, options.format));
    let started_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    session.reporter_mut().banner(&cfg.api_version, &started_at)?;
    permissions::validate_token(&mut session, &cfg.required_permissions).await?;
    driver::run_drill_down(&mut session, options.drill_down).await
}
