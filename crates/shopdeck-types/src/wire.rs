use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel `action` value: the backend wants the merchant routed to the
/// subscription prompt, whatever `success` says.
pub const ACTION_SUBSCRIBE: &str = "subscribe";

/// Envelope returned by every business operation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OperationResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl OperationResponse {
    /// True when the caller must branch to the subscription-prompt path,
    /// regardless of the `success` flag.
    pub fn requires_subscription(&self) -> bool {
        self.action.as_deref() == Some(ACTION_SUBSCRIBE)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct StoreStatus {
    pub is_connected: bool,
}

/// Ambient page metadata attached to every batched telemetry report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    pub user_agent: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen: Option<String>,
    pub embedded: bool,
    pub has_shop: bool,
    pub has_host: bool,
}

/// Body for `POST /api/log_error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub timestamp: DateTime<Utc>,
    pub error_type: String,
    pub error_message: String,
    pub error_location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_data: Option<Value>,
    pub user_agent: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
    pub session_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_sentinel_wins_over_success_flag() {
        let envelope: OperationResponse = serde_json::from_str(
            r#"{"success": false, "error": "plan required", "action": "subscribe"}"#,
        )
        .unwrap();
        assert!(!envelope.success);
        assert!(envelope.requires_subscription());
    }

    #[test]
    fn plain_failure_is_not_a_subscription_prompt() {
        let envelope: OperationResponse =
            serde_json::from_str(r#"{"success": false, "error": "boom"}"#).unwrap();
        assert!(!envelope.requires_subscription());
    }
}
