use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::Utc;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use shopdeck_client::{
    run_slot, store_status, AuthenticatedClient, OperationOutcome, ReadinessPoller, RequestError,
    ResponseClassifier, Slot, SlotRegistry, TokenProviderAdapter,
};
use shopdeck_telemetry::DiagnosticLog;
use shopdeck_types::{
    DiagnosticEvent, EnvironmentInfo, ErrorReport, EventLevel, ReadinessOutcome, SessionParams,
    StateSnapshot, StoreStatus,
};

use crate::document::Document;
use crate::linkwatch::LinkObserver;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Origin the API and telemetry endpoints live on.
    pub base_url: String,
    /// Full page location, query string included.
    pub location: String,
    pub user_agent: String,
    pub referrer: Option<String>,
    pub screen: Option<String>,
    pub ready_interval: Duration,
    pub ready_max_attempts: u32,
    /// Handshake slower than this gets a WARNING-level diagnostic event.
    pub ready_latency_warn_ms: u64,
}

impl SessionConfig {
    pub fn new(base_url: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            location: location.into(),
            user_agent: "shopdeck-client".to_string(),
            referrer: None,
            screen: None,
            ready_interval: Duration::from_millis(100),
            ready_max_attempts: 50,
            ready_latency_warn_ms: 2_000,
        }
    }
}

/// Single owner of every piece of process-wide mutable state: the parameter
/// capture, the diagnostic trail, the slot registry, the transport, and the
/// page tree. Nothing in the crate reaches for ambient globals.
pub struct Session {
    id: String,
    params: SessionParams,
    config: SessionConfig,
    log: DiagnosticLog,
    registry: SlotRegistry,
    client: Arc<AuthenticatedClient>,
    classifier: Arc<ResponseClassifier>,
    classifier_installed: AtomicBool,
    document: Mutex<Document>,
    started: Instant,
}

impl Session {
    pub fn new(config: SessionConfig, tokens: TokenProviderAdapter) -> anyhow::Result<Self> {
        let location = Url::parse(&config.location).context("invalid page location")?;
        let params = SessionParams::from_query_pairs(
            location
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned())),
        );

        let environment = EnvironmentInfo {
            user_agent: config.user_agent.clone(),
            url: config.location.clone(),
            referrer: config.referrer.clone(),
            screen: config.screen.clone(),
            embedded: params.embedded,
            has_shop: params.shop.is_some(),
            has_host: params.host.is_some(),
        };

        let id = format!("cs_{}", Uuid::new_v4().simple());
        let log = DiagnosticLog::new(&config.base_url, id.clone(), environment);
        let client = Arc::new(AuthenticatedClient::new(
            &config.base_url,
            tokens,
            params.embedded,
        )?);
        let classifier = Arc::new(ResponseClassifier::new(log.clone()));

        let mut document = Document::new();
        document.attach_observer(Arc::new(LinkObserver::new(location, &params)));

        Ok(Self {
            id,
            params,
            config,
            log,
            registry: SlotRegistry::new(),
            client,
            classifier,
            classifier_installed: AtomicBool::new(false),
            document: Mutex::new(document),
            started: Instant::now(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    pub fn log(&self) -> &DiagnosticLog {
        &self.log
    }

    pub fn registry(&self) -> &SlotRegistry {
        &self.registry
    }

    /// Wire the response classifier into the transport, once. Later calls
    /// are no-ops so a second instrumentation pass cannot double-wrap.
    pub fn install_classifier(&self) -> bool {
        if self.classifier_installed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.client.install_inspector(self.classifier.clone())
    }

    /// Startup sequence: capture a state snapshot, flag missing embed
    /// parameters, install the classifier, then poll the embedding
    /// handshake. Latency policy lives here; the poller only measures.
    pub async fn bootstrap<F>(&self, handshake: F) -> ReadinessOutcome
    where
        F: FnMut() -> bool,
    {
        self.log.record_snapshot(self.snapshot("session_start"));

        for name in self.params.missing_embedded_params() {
            warn!(parameter = name, "required embed parameter missing");
            self.log.append(
                DiagnosticEvent::new("missing required parameter", self.elapsed_ms())
                    .with_level(EventLevel::Warning)
                    .with_context("parameter", name),
            );
        }

        self.install_classifier();

        let poller =
            ReadinessPoller::new(self.config.ready_interval, self.config.ready_max_attempts);
        let outcome = poller.run(handshake).await;

        if !outcome.ready {
            self.log.append(
                DiagnosticEvent::new("embedding handshake timed out", self.elapsed_ms())
                    .with_level(EventLevel::Error)
                    .with_context("attempts", outcome.attempts),
            );
        } else if outcome.elapsed_ms > self.config.ready_latency_warn_ms {
            self.log.append(
                DiagnosticEvent::new("embedding handshake slow", self.elapsed_ms())
                    .with_level(EventLevel::Warning)
                    .with_context("handshake_ms", outcome.elapsed_ms),
            );
        } else {
            info!(handshake_ms = outcome.elapsed_ms, "embedding handshake complete");
        }

        self.classifier.set_phase("active");
        self.log.record_snapshot(self.snapshot("bootstrap_complete"));
        outcome
    }

    /// Run a slot operation. `None` means the request was superseded and its
    /// result must not reach the page.
    pub async fn run(&self, slot: Slot) -> Option<OperationOutcome> {
        let cancel = self.registry.begin(slot).await;
        let result = run_slot(&self.client, slot, &cancel).await;

        if cancel.is_cancelled() {
            // The superseding begin() already replaced our registry entry.
            return None;
        }
        self.registry.remove(slot).await;

        match result {
            Ok(outcome) => Some(outcome),
            Err(err) if err.is_cancelled() => None,
            Err(err) => {
                self.log.append(
                    DiagnosticEvent::new(
                        format!("operation {} failed", slot.as_str()),
                        self.elapsed_ms(),
                    )
                    .with_level(EventLevel::Error)
                    .with_context("kind", err.kind())
                    .with_context("detail", err.to_string()),
                );
                let report = self.error_report(&err, slot.endpoint());
                let log = self.log.clone();
                tokio::spawn(async move {
                    log.report_error(report).await;
                });
                Some(OperationOutcome::Failed(err.to_string()))
            }
        }
    }

    pub async fn check_store_status(&self) -> Result<StoreStatus, RequestError> {
        store_status(&self.client, &CancellationToken::new()).await
    }

    /// Mutate the page tree under the session's lock.
    pub fn with_document<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        f(&mut self.document.lock())
    }

    /// Final report and slot sweep when the page goes away.
    pub async fn finish(&self) {
        self.registry.cancel_all().await;
        self.log.record_snapshot(self.snapshot("session_end"));
        self.log.report_batch().await;
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn snapshot(&self, name: &str) -> StateSnapshot {
        StateSnapshot {
            name: name.to_string(),
            timestamp: Utc::now(),
            url: self.config.location.clone(),
            embedded: self.params.embedded,
            has_shop: self.params.shop.is_some(),
            has_host: self.params.host.is_some(),
            has_id_token: self.params.id_token.is_some(),
        }
    }

    fn error_report(&self, err: &RequestError, location: &str) -> ErrorReport {
        ErrorReport {
            timestamp: Utc::now(),
            error_type: err.kind().to_string(),
            error_message: err.to_string(),
            error_location: location.to_string(),
            stack_trace: None,
            error_data: None,
            user_agent: self.config.user_agent.clone(),
            url: self.config.location.clone(),
            referer: self.config.referrer.clone(),
            session_id: self.id.clone(),
        }
    }
}
