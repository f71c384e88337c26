use thiserror::Error;

/// Failure taxonomy for authenticated requests. Authentication and network
/// failures are recovered at the lowest possible layer (one retry) and
/// otherwise surface as a single terminal variant to the operation caller.
#[derive(Debug, Error)]
pub enum RequestError {
    /// 401 that survived the one refresh-and-retry attempt.
    #[error("unauthorized: credential rejected after refresh")]
    Unauthorized,

    /// 404; recorded as a diagnostic failure, never retried.
    #[error("resource not found: {url}")]
    NotFound { url: String },

    /// Any other non-success HTTP status.
    #[error("request failed with status {status}")]
    Http { status: u16 },

    /// No response at all; surfaced as a connectivity failure.
    #[error("network unreachable: {0}")]
    Network(#[source] reqwest::Error),

    /// Superseded by a newer request for the same slot. Not an error to
    /// report; callers discard the result silently.
    #[error("request superseded")]
    Cancelled,
}

impl RequestError {
    /// Stable label for error-log reports.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestError::Unauthorized => "unauthorized",
            RequestError::NotFound { .. } => "not_found",
            RequestError::Http { .. } => "http",
            RequestError::Network(_) => "network",
            RequestError::Cancelled => "cancelled",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RequestError::Cancelled)
    }
}
