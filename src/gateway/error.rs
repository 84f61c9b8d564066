use thiserror::Error;

/// Failure kinds surfaced by the verifier, the provider adapters and the broker.
///
/// The core never builds an HTTP response; the route layer maps each kind to a status.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("upstream service unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("provider protocol error: {0}")]
    ProviderProtocolError(String),
}

impl AuthError {
    /// Stable machine-readable name of the kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::UnknownProvider(_) => "unknown_provider",
            Self::ProviderProtocolError(_) => "provider_protocol_error",
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::UpstreamUnavailable(err.to_string())
    }
}
