use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::gateway::AuthError;

/// JSON body of every failed request.
#[derive(ToSchema, Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// 400 answer for input rejected before anything reaches the upstream service.
#[must_use]
pub fn invalid_request(message: &str) -> Response {
    let body = ErrorBody {
        error: "invalid_request".to_string(),
        message: message.to_string(),
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

/// Route-layer wrapper that turns an [`AuthError`] into an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub AuthError);

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self(err)
    }
}

impl ApiError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self.0 {
            AuthError::Unauthorized | AuthError::UnknownProvider(_) => StatusCode::UNAUTHORIZED,
            AuthError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            AuthError::ProviderProtocolError(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Upstream and provider details stay in the logs.
        let message = match &self.0 {
            AuthError::Unauthorized | AuthError::UnknownProvider(_) => {
                warn!("{}", self.0);
                self.0.to_string()
            }
            AuthError::UpstreamUnavailable(detail) => {
                error!("Upstream unavailable: {detail}");
                "upstream service unavailable".to_string()
            }
            AuthError::ProviderProtocolError(detail) => {
                error!("Provider protocol error: {detail}");
                "identity provider returned an unexpected response".to_string()
            }
        };

        let body = ErrorBody {
            error: self.0.kind().to_string(),
            message,
        };

        (self.status(), Json(body)).into_response()
    }
}
