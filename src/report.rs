use crate::http::HttpMethod;
use crate::types::{Metrics, RateLimitState};
use serde_json::Value;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl ReportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Writes the human facing per-call report. In `Json` mode every event is a
/// single JSON line carrying the same facts as the text rendering.
pub struct Reporter<W: Write> {
    out: W,
    format: ReportFormat,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, format: ReportFormat) -> Self {
        Self { out, format }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn json_line(&mut self, v: &Value) -> io::Result<()> {
        writeln!(self.out, "{}", v)
    }

    pub fn banner(&mut self, api_version: &str, started_at: &str) -> io::Result<()> {
        match self.format {
            ReportFormat::Text => {
                writeln!(self.out, "=== Starting API probe ===")?;
                writeln!(self.out, "Date/time: {}", started_at)?;
                writeln!(self.out, "API version: {}", api_version)
            }
            ReportFormat::Json => self.json_line(&serde_json::json!({
                "event": "start",
                "api_version": api_version,
                "started_at": started_at,
            })),
        }
    }

    pub fn section(&mut self, number: usize, title: &str) -> io::Result<()> {
        match self.format {
            ReportFormat::Text => writeln!(self.out, "\n{}. {}", number, title),
            ReportFormat::Json => Ok(()),
        }
    }

    pub fn probe(
        &mut self,
        method: HttpMethod,
        path: &str,
        metrics: &Metrics,
        body: Option<&Value>,
        state: &RateLimitState,
    ) -> io::Result<()> {
        match self.format {
            ReportFormat::Text => {
                writeln!(self.out, "\n=== {} {} ===", method, path)?;
                writeln!(self.out, "Status: {}", metrics.status_code)?;
                writeln!(self.out, "Response time: {:.3}s", metrics.response_time_secs)?;
                writeln!(
                    self.out,
                    "Rate limit used: {}/{}",
                    metrics.rate_limit_points, state.points_total
                )?;
                writeln!(self.out, "Cache hit: {}", yes_no(metrics.cache_hit))?;
                writeln!(self.out, "Data complete: {}", yes_no(metrics.data_complete))?;
                if let Some(err) = &metrics.error {
                    writeln!(self.out, "\nError: {}", pretty(err))?;
                } else if let Some(b) = body.filter(|b| !is_empty_json(b)) {
                    writeln!(self.out, "\nResponse: {}", pretty(b))?;
                }
                Ok(())
            }
            ReportFormat::Json => {
                let body = if metrics.error.is_some() { None } else { body };
                self.json_line(&serde_json::json!({
                    "event": "probe",
                    "method": method.to_string(),
                    "path": path,
                    "metrics": metrics,
                    "rate_limit_total": state.points_total,
                    "body": body,
                }))
            }
        }
    }

    pub fn transport_error(&mut self, method: HttpMethod, path: &str, message: &str) -> io::Result<()> {
        match self.format {
            ReportFormat::Text => {
                writeln!(self.out, "\n=== {} {} ===", method, path)?;
                writeln!(self.out, "Request error: {}", message)
            }
            ReportFormat::Json => self.json_line(&serde_json::json!({
                "event": "transport_error",
                "method": method.to_string(),
                "path": path,
                "message": message,
            })),
        }
    }

    pub fn skipped(&mut self, number: usize, title: &str, requires: &str) -> io::Result<()> {
        match self.format {
            ReportFormat::Text => writeln!(
                self.out,
                "\n{}. Skipped: {} (no data from {})",
                number, title, requires
            ),
            ReportFormat::Json => self.json_line(&serde_json::json!({
                "event": "skipped",
                "step": number,
                "title": title,
                "requires": requires,
            })),
        }
    }

    pub fn line(&mut self, text: &str) -> io::Result<()> {
        match self.format {
            ReportFormat::Text => writeln!(self.out, "{}", text),
            ReportFormat::Json => {
                self.json_line(&serde_json::json!({ "event": "note", "message": text.trim() }))
            }
        }
    }
}

fn pretty(v: &Value) -> String {
    serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
}

// Empty objects/arrays/null print nothing, matching a falsy body.
fn is_empty_json(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Object(o) => o.is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}
