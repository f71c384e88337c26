use reqwest::Method;
use tokio_util::sync::CancellationToken;
use tracing::info;

use shopdeck_types::{OperationResponse, StoreStatus};

use crate::error::RequestError;
use crate::slots::Slot;
use crate::transport::AuthenticatedClient;

/// What the UI layer should do with a finished operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    /// Result markup ready to insert into the page.
    Rendered(String),
    /// Informational message, no markup.
    Notice(String),
    /// The backend wants the merchant routed to the subscription prompt.
    SubscribeRequired,
    /// Terminal failure; generic failure messaging.
    Failed(String),
}

/// Issue the slot's operation and decode its envelope. The cancellation
/// handle is re-checked after every await so a superseded request's stale
/// result is discarded instead of applied.
pub async fn run_slot(
    client: &AuthenticatedClient,
    slot: Slot,
    cancel: &CancellationToken,
) -> Result<OperationOutcome, RequestError> {
    let response = client
        .request(Method::GET, slot.endpoint(), None, cancel)
        .await?;
    let envelope: OperationResponse = response.json().await.map_err(RequestError::Network)?;
    if cancel.is_cancelled() {
        return Err(RequestError::Cancelled);
    }
    info!(slot = slot.as_str(), success = envelope.success, "operation finished");
    Ok(outcome_from(envelope))
}

pub async fn store_status(
    client: &AuthenticatedClient,
    cancel: &CancellationToken,
) -> Result<StoreStatus, RequestError> {
    let response = client.get("/api/store/status", cancel).await?;
    let status: StoreStatus = response.json().await.map_err(RequestError::Network)?;
    if cancel.is_cancelled() {
        return Err(RequestError::Cancelled);
    }
    Ok(status)
}

fn outcome_from(envelope: OperationResponse) -> OperationOutcome {
    // The subscribe sentinel wins regardless of the success flag.
    if envelope.requires_subscription() {
        return OperationOutcome::SubscribeRequired;
    }
    if envelope.success {
        if let Some(html) = envelope.html {
            OperationOutcome::Rendered(html)
        } else {
            OperationOutcome::Notice(
                envelope
                    .message
                    .unwrap_or_else(|| "operation completed".to_string()),
            )
        }
    } else {
        OperationOutcome::Failed(
            envelope
                .error
                .or(envelope.message)
                .unwrap_or_else(|| "operation failed".to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenProviderAdapter;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn plain_client(server: &MockServer) -> AuthenticatedClient {
        AuthenticatedClient::new(server.uri(), TokenProviderAdapter::absent(), false).unwrap()
    }

    #[tokio::test]
    async fn successful_operation_renders_markup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/process_orders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true, "html": "<table>3 orders</table>"
            })))
            .mount(&server)
            .await;

        let client = plain_client(&server);
        let cancel = CancellationToken::new();
        let outcome = run_slot(&client, Slot::ProcessOrders, &cancel).await.unwrap();
        assert_eq!(
            outcome,
            OperationOutcome::Rendered("<table>3 orders</table>".into())
        );
    }

    #[tokio::test]
    async fn subscribe_sentinel_overrides_the_failure_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/generate_report"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false, "error": "plan required", "action": "subscribe"
            })))
            .mount(&server)
            .await;

        let client = plain_client(&server);
        let cancel = CancellationToken::new();
        let outcome = run_slot(&client, Slot::GenerateReport, &cancel).await.unwrap();
        assert_eq!(outcome, OperationOutcome::SubscribeRequired);
    }

    #[tokio::test]
    async fn failed_operation_surfaces_its_error_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/update_inventory"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false, "error": "inventory locked"
            })))
            .mount(&server)
            .await;

        let client = plain_client(&server);
        let cancel = CancellationToken::new();
        let outcome = run_slot(&client, Slot::UpdateInventory, &cancel).await.unwrap();
        assert_eq!(outcome, OperationOutcome::Failed("inventory locked".into()));
    }

    #[tokio::test]
    async fn store_status_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/store/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "is_connected": false
            })))
            .mount(&server)
            .await;

        let client = plain_client(&server);
        let cancel = CancellationToken::new();
        let status = store_status(&client, &cancel).await.unwrap();
        assert!(!status.is_connected);
    }

    #[tokio::test]
    async fn superseded_request_resolves_to_cancelled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/process_orders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true, "html": "<div>stale</div>"
            })))
            .mount(&server)
            .await;

        let client = plain_client(&server);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = run_slot(&client, Slot::ProcessOrders, &cancel)
            .await
            .err()
            .unwrap();
        assert!(err.is_cancelled());
    }
}
