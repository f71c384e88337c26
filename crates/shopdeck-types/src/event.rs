use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    Info,
    Warning,
    Error,
    Critical,
}

impl EventLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            EventLevel::Info => "info",
            EventLevel::Warning => "warning",
            EventLevel::Error => "error",
            EventLevel::Critical => "critical",
        }
    }
}

/// One entry in the diagnostic trail. Never mutated after it is appended;
/// ordering is insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    pub timestamp: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<EventLevel>,
    #[serde(default, flatten)]
    pub context: Map<String, Value>,
}

impl DiagnosticEvent {
    pub fn new(message: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            timestamp: Utc::now(),
            elapsed_ms,
            message: message.into(),
            level: None,
            context: Map::new(),
        }
    }

    pub fn with_level(mut self, level: EventLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Named capture of the ambient session parameters at a point in time.
/// Read-only once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub url: String,
    pub embedded: bool,
    pub has_shop: bool,
    pub has_host: bool,
    pub has_id_token: bool,
}

/// Captured only for the unauthorized and not-found failure classes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestFailure {
    pub url: String,
    pub status: u16,
    pub method: String,
    pub timestamp: DateTime<Utc>,
    pub state: String,
}

/// Terminal result of one readiness poll cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadinessOutcome {
    pub ready: bool,
    pub elapsed_ms: u64,
    pub attempts: u32,
}
