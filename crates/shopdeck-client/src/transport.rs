//! Outbound request transport.
//!
//! Inside the embed every request rides on a short-lived bearer token and
//! deliberately omits ambient cookies; outside it (or when the token source
//! is unavailable) requests fall back to the session-cookie jar. The mode is
//! resolved exactly once per attempt, and a fresh token is fetched for every
//! authenticated attempt rather than cached.

use std::sync::{Arc, OnceLock};

use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::RequestError;
use crate::intercept::ResponseClassifier;
use crate::token::{TokenProviderAdapter, TokenState};

/// Credential mode for one request attempt.
#[derive(Debug, Clone)]
pub enum TransportMode {
    /// Ambient session cookies travel with the request; no bearer header.
    SessionCookies,
    /// `Authorization: Bearer` attached, cookies omitted entirely.
    BearerToken(String),
}

pub struct AuthenticatedClient {
    cookie_client: Client,
    bare_client: Client,
    tokens: TokenProviderAdapter,
    base_url: String,
    embedded: bool,
    inspector: OnceLock<Arc<ResponseClassifier>>,
}

impl AuthenticatedClient {
    pub fn new(
        base_url: impl Into<String>,
        tokens: TokenProviderAdapter,
        embedded: bool,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            cookie_client: Client::builder().cookie_store(true).build()?,
            bare_client: Client::builder().build()?,
            tokens,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            embedded,
            inspector: OnceLock::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Wire the response classifier into the transport. Returns false when a
    /// classifier is already installed; the existing one keeps observing.
    pub fn install_inspector(&self, inspector: Arc<ResponseClassifier>) -> bool {
        self.inspector.set(inspector).is_ok()
    }

    pub async fn get(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Response, RequestError> {
        self.request(Method::GET, path, None, cancel).await
    }

    /// Issue one logical request. At most one retry: a 401 answered while a
    /// fresh token can still be fetched is re-sent once with that token, and
    /// a second 401 is terminal.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        cancel: &CancellationToken,
    ) -> Result<Response, RequestError> {
        let mode = self.resolve_mode().await;
        let response = self.attempt(&method, path, body, &mode, cancel).await?;

        if response.status() == StatusCode::UNAUTHORIZED && self.embedded {
            if let TokenState::Fresh(token) = self.tokens.fetch().await {
                debug!(path, "credential expired, retrying once with a refreshed token");
                let retried = self
                    .attempt(&method, path, body, &TransportMode::BearerToken(token), cancel)
                    .await?;
                return surface(retried);
            }
        }
        surface(response)
    }

    async fn resolve_mode(&self) -> TransportMode {
        if !self.embedded {
            return TransportMode::SessionCookies;
        }
        match self.tokens.fetch().await {
            TokenState::Fresh(token) => TransportMode::BearerToken(token),
            // The request is still issued on the fallback path, never dropped.
            TokenState::Unavailable => TransportMode::SessionCookies,
        }
    }

    async fn attempt(
        &self,
        method: &Method,
        path: &str,
        body: Option<&Value>,
        mode: &TransportMode,
        cancel: &CancellationToken,
    ) -> Result<Response, RequestError> {
        let url = format!("{}{}", self.base_url, path);
        let client = match mode {
            TransportMode::SessionCookies => &self.cookie_client,
            TransportMode::BearerToken(_) => &self.bare_client,
        };
        let mut req = client.request(method.clone(), &url);
        if let TransportMode::BearerToken(token) = mode {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(RequestError::Cancelled),
            sent = req.send() => sent.map_err(RequestError::Network)?,
        };

        if let Some(inspector) = self.inspector.get() {
            inspector.observe(method, response.url().as_str(), response.status());
        }
        Ok(response)
    }
}

fn surface(response: Response) -> Result<Response, RequestError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::UNAUTHORIZED => Err(RequestError::Unauthorized),
        StatusCode::NOT_FOUND => Err(RequestError::NotFound {
            url: response.url().to_string(),
        }),
        _ => Err(RequestError::Http {
            status: status.as_u16(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenSource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Issues tok-1, tok-2, ... so retries are visibly fresher.
    #[derive(Default)]
    struct CountingSource {
        calls: AtomicU32,
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn id_token(&self) -> anyhow::Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("tok-{n}"))
        }
    }

    fn embedded_client(server: &MockServer) -> AuthenticatedClient {
        AuthenticatedClient::new(
            server.uri(),
            TokenProviderAdapter::new(Arc::new(CountingSource::default())),
            true,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn embedded_request_carries_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/store/status"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "is_connected": true
            })))
            .mount(&server)
            .await;

        let client = embedded_client(&server);
        let cancel = CancellationToken::new();
        let resp = client.get("/api/store/status", &cancel).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn expired_credential_is_retried_once_with_a_fresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/process_orders"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/process_orders"))
            .and(header("authorization", "Bearer tok-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true, "html": "<div>ok</div>"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = embedded_client(&server);
        let cancel = CancellationToken::new();
        let resp = client.get("/api/process_orders", &cancel).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn second_unauthorized_is_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/process_orders"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = embedded_client(&server);
        let cancel = CancellationToken::new();
        let err = client
            .get("/api/process_orders", &cancel)
            .await
            .err()
            .expect("expected terminal failure");
        assert!(matches!(err, RequestError::Unauthorized));

        // Exactly one retry: the endpoint saw two requests in total.
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
    }

    #[tokio::test]
    async fn unavailable_token_falls_back_to_cookie_mode() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/update_inventory"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true, "message": "done"
            })))
            .mount(&server)
            .await;

        let client = AuthenticatedClient::new(
            server.uri(),
            TokenProviderAdapter::absent(),
            true,
        )
        .unwrap();
        let cancel = CancellationToken::new();
        let resp = client.get("/api/update_inventory", &cancel).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let requests = server.received_requests().await.unwrap();
        assert!(!requests[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn unembedded_request_never_attaches_a_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/generate_report"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true
            })))
            .mount(&server)
            .await;

        let client = AuthenticatedClient::new(
            server.uri(),
            TokenProviderAdapter::new(Arc::new(CountingSource::default())),
            false,
        )
        .unwrap();
        let cancel = CancellationToken::new();
        client.get("/api/generate_report", &cancel).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert!(!requests[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn not_found_and_other_statuses_are_distinct() {
        let server = MockServer::start().await;
        Mock::given(path("/api/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(path("/api/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = embedded_client(&server);
        let cancel = CancellationToken::new();
        assert!(matches!(
            client.get("/api/missing", &cancel).await,
            Err(RequestError::NotFound { .. })
        ));
        assert!(matches!(
            client.get("/api/broken", &cancel).await,
            Err(RequestError::Http { status: 500 })
        ));
    }

    #[tokio::test]
    async fn network_failure_is_its_own_kind() {
        // Nothing listens here.
        let client = AuthenticatedClient::new(
            "http://127.0.0.1:9",
            TokenProviderAdapter::absent(),
            false,
        )
        .unwrap();
        let cancel = CancellationToken::new();
        let err = client.get("/api/process_orders", &cancel).await.err().unwrap();
        assert!(matches!(err, RequestError::Network(_)));
    }

    #[tokio::test]
    async fn cancellation_aborts_an_in_flight_request() {
        let server = MockServer::start().await;
        Mock::given(path("/api/process_orders"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let client = embedded_client(&server);
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel_clone.cancel();
        });

        let err = client.get("/api/process_orders", &cancel).await.err().unwrap();
        assert!(err.is_cancelled());
    }
}
