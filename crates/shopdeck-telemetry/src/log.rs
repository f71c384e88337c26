//! In-memory diagnostic trail plus best-effort shipping to the collection
//! endpoint. Reporting failures are logged locally and never retried:
//! observability must not amplify failure.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use shopdeck_types::{DiagnosticEvent, EnvironmentInfo, ErrorReport, EventLevel, StateSnapshot};

/// Bound on the retained session audit trail. Overflow drops the oldest
/// event and is counted in batch reports.
pub const MAX_BUFFERED_EVENTS: usize = 2048;

const TELEMETRY_PATH: &str = "/client-telemetry/log";
const ERROR_LOG_PATH: &str = "/api/log_error";

#[derive(Debug, Default)]
struct LogBuffer {
    events: VecDeque<DiagnosticEvent>,
    snapshots: Vec<StateSnapshot>,
    dropped_events: u64,
}

/// Session-lifetime diagnostic event log. Cloning shares the buffer.
#[derive(Clone)]
pub struct DiagnosticLog {
    buffer: Arc<Mutex<LogBuffer>>,
    client: Client,
    base_url: String,
    user_id: String,
    environment: EnvironmentInfo,
}

#[derive(Serialize)]
struct TelemetryReport<'a> {
    user_id: &'a str,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    events: Option<&'a [DiagnosticEvent]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state_snapshots: Option<&'a [StateSnapshot]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    environment: Option<&'a EnvironmentInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    event: Option<&'a DiagnosticEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dropped_events: Option<u64>,
}

impl DiagnosticLog {
    pub fn new(
        base_url: impl Into<String>,
        user_id: impl Into<String>,
        environment: EnvironmentInfo,
    ) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(LogBuffer::default())),
            client: Client::new(),
            base_url: normalize_base(base_url.into()),
            user_id: user_id.into(),
            environment,
        }
    }

    /// Synchronous append; never fails.
    pub fn append(&self, event: DiagnosticEvent) {
        let mut buf = self.buffer.lock();
        if buf.events.len() >= MAX_BUFFERED_EVENTS {
            buf.events.pop_front();
            buf.dropped_events += 1;
        }
        buf.events.push_back(event);
    }

    pub fn record_snapshot(&self, snapshot: StateSnapshot) {
        self.buffer.lock().snapshots.push(snapshot);
    }

    pub fn event_count(&self) -> usize {
        self.buffer.lock().events.len()
    }

    pub fn dropped_events(&self) -> u64 {
        self.buffer.lock().dropped_events
    }

    /// Last appended events, newest last. For local inspection only.
    pub fn tail(&self, n: usize) -> Vec<DiagnosticEvent> {
        let buf = self.buffer.lock();
        buf.events.iter().rev().take(n).rev().cloned().collect()
    }

    /// Ship the full trail plus environment metadata. The buffer is not
    /// cleared: the session keeps its audit trail until the page goes away.
    pub async fn report_batch(&self) {
        let (events, snapshots, dropped) = {
            let buf = self.buffer.lock();
            (
                buf.events.iter().cloned().collect::<Vec<_>>(),
                buf.snapshots.clone(),
                buf.dropped_events,
            )
        };
        let report = TelemetryReport {
            user_id: &self.user_id,
            timestamp: Utc::now(),
            level: None,
            events: Some(&events),
            state_snapshots: Some(&snapshots),
            environment: Some(&self.environment),
            event: None,
            dropped_events: Some(dropped),
        };
        self.post(TELEMETRY_PATH, &report, "batch").await;
    }

    /// Ship one event immediately, independent of batching.
    pub async fn report_critical(&self, event: DiagnosticEvent) {
        let report = TelemetryReport {
            user_id: &self.user_id,
            timestamp: Utc::now(),
            level: Some(EventLevel::Critical.as_str()),
            events: None,
            state_snapshots: None,
            environment: None,
            event: Some(&event),
            dropped_events: None,
        };
        self.post(TELEMETRY_PATH, &report, "critical").await;
    }

    /// Ship an error report to the error-log endpoint.
    pub async fn report_error(&self, report: ErrorReport) {
        self.post(ERROR_LOG_PATH, &report, "error").await;
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T, kind: &str) {
        let url = format!("{}{}", self.base_url, path);
        match self.client.post(&url).json(body).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!(kind, "telemetry report delivered");
            }
            Ok(resp) => {
                warn!(kind, status = %resp.status(), "telemetry report rejected");
            }
            Err(err) => {
                warn!(kind, error = %err, "telemetry report failed");
            }
        }
    }
}

fn normalize_base(base: String) -> String {
    base.trim_end_matches('/').to_string()
}
