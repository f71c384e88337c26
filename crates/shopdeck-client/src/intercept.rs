use std::time::Instant;

use chrono::Utc;
use parking_lot::Mutex;
use reqwest::{Method, StatusCode};
use tracing::warn;

use shopdeck_telemetry::DiagnosticLog;
use shopdeck_types::{DiagnosticEvent, EventLevel, RequestFailure};

/// Observes every response that passes through the transport and classifies
/// it by status. Unauthorized (401) and not-found (404) produce a failure
/// record, an event log append, and an immediate critical dispatch; every
/// other status passes through unobserved. Classification never alters the
/// response handed back to the caller.
pub struct ResponseClassifier {
    log: DiagnosticLog,
    phase: Mutex<String>,
    started: Instant,
}

impl ResponseClassifier {
    pub fn new(log: DiagnosticLog) -> Self {
        Self {
            log,
            phase: Mutex::new("bootstrap".to_string()),
            started: Instant::now(),
        }
    }

    /// Session phase recorded into failure records (`bootstrap`, `active`).
    pub fn set_phase(&self, phase: impl Into<String>) {
        *self.phase.lock() = phase.into();
    }

    pub fn phase(&self) -> String {
        self.phase.lock().clone()
    }

    pub fn observe(&self, method: &Method, url: &str, status: StatusCode) {
        let class = match status.as_u16() {
            401 => "unauthorized",
            404 => "not_found",
            _ => return,
        };
        let failure = RequestFailure {
            url: url.to_string(),
            status: status.as_u16(),
            method: method.to_string(),
            timestamp: Utc::now(),
            state: self.phase(),
        };
        warn!(method = %method, url, status = failure.status, "classified request failure");

        let event = DiagnosticEvent::new(
            format!("request {class}: {method} {url}"),
            self.started.elapsed().as_millis() as u64,
        )
        .with_level(EventLevel::Critical)
        .with_context("url", failure.url.clone())
        .with_context("status", failure.status)
        .with_context("method", failure.method.clone())
        .with_context("state", failure.state.clone());

        self.log.append(event.clone());

        // The request path never waits on telemetry.
        let log = self.log.clone();
        tokio::spawn(async move {
            log.report_critical(event).await;
        });
    }
}
