use crate::error::ProbeError;
use crate::http::{normalize, HttpMethod, Normalized, Params, Probe};
use crate::report::Reporter;
use crate::types::RateLimitState;
use std::io::Write;

/// One probe run: the transport, the last observed rate-limit state, and the
/// report sink. Every call is sent, normalized against the current state, and
/// reported before the next one is built.
pub struct Session<W: Write> {
    probe: Probe,
    state: RateLimitState,
    reporter: Reporter<W>,
}

impl<W: Write> Session<W> {
    pub fn new(probe: Probe, reporter: Reporter<W>) -> Self {
        Self {
            probe,
            state: RateLimitState::default(),
            reporter,
        }
    }

    pub fn state(&self) -> RateLimitState {
        self.state
    }

    pub fn reporter_mut(&mut self) -> &mut Reporter<W> {
        &mut self.reporter
    }

    pub fn into_reporter(self) -> Reporter<W> {
        self.reporter
    }

    /// Transport failures are reported and returned; application errors in
    /// the body come back inside `Ok` as `Metrics::error`.
    pub async fn call(
        &mut self,
        path: &str,
        method: HttpMethod,
        params: Option<&Params>,
    ) -> Result<Normalized, ProbeError> {
        let raw = match self.probe.send(path, method, params).await {
            Ok(raw) => raw,
            Err(e) => {
                // A failed report write outranks the transport error it was describing.
                self.reporter.transport_error(method, path, &e.to_string())?;
                return Err(e);
            }
        };
        let normalized = normalize(raw, self.state);
        self.state = normalized.state;
        self.reporter.probe(
            method,
            path,
            &normalized.metrics,
            normalized.body.as_ref(),
            &self.state,
        )?;
        Ok(normalized)
    }
}
