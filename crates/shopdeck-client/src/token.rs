use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

/// Identity-token boundary supplied by the embedding host. May be absent
/// entirely when the client runs outside the embed.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn id_token(&self) -> anyhow::Result<String>;
}

/// Outcome of one token fetch. A token is held for a single request attempt
/// and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    Fresh(String),
    Unavailable,
}

/// Wraps the external token source. Never errors to its caller: a missing
/// source short-circuits and a failing one degrades to `Unavailable`.
#[derive(Clone, Default)]
pub struct TokenProviderAdapter {
    source: Option<Arc<dyn TokenSource>>,
}

impl TokenProviderAdapter {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self {
            source: Some(source),
        }
    }

    pub fn absent() -> Self {
        Self { source: None }
    }

    pub fn is_present(&self) -> bool {
        self.source.is_some()
    }

    pub async fn fetch(&self) -> TokenState {
        let Some(source) = &self.source else {
            return TokenState::Unavailable;
        };
        match source.id_token().await {
            Ok(token) if !token.trim().is_empty() => TokenState::Fresh(token),
            Ok(_) => {
                debug!("token source returned an empty token");
                TokenState::Unavailable
            }
            Err(err) => {
                debug!(error = %err, "token source failed");
                TokenState::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedToken(&'static str);

    #[async_trait]
    impl TokenSource for FixedToken {
        async fn id_token(&self) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl TokenSource for BrokenSource {
        async fn id_token(&self) -> anyhow::Result<String> {
            anyhow::bail!("host bridge not responding")
        }
    }

    #[tokio::test]
    async fn absent_source_short_circuits() {
        let adapter = TokenProviderAdapter::absent();
        assert!(!adapter.is_present());
        assert_eq!(adapter.fetch().await, TokenState::Unavailable);
    }

    #[tokio::test]
    async fn failing_source_degrades_to_unavailable() {
        let adapter = TokenProviderAdapter::new(Arc::new(BrokenSource));
        assert_eq!(adapter.fetch().await, TokenState::Unavailable);
    }

    #[tokio::test]
    async fn empty_token_counts_as_unavailable() {
        let adapter = TokenProviderAdapter::new(Arc::new(FixedToken("  ")));
        assert_eq!(adapter.fetch().await, TokenState::Unavailable);
    }

    #[tokio::test]
    async fn fresh_token_passes_through() {
        let adapter = TokenProviderAdapter::new(Arc::new(FixedToken("tok-1")));
        assert_eq!(adapter.fetch().await, TokenState::Fresh("tok-1".into()));
    }
}
