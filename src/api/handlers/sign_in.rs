use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use super::{cookie_header, parse_basic_auth};
use crate::{
    api::{error::ApiError, state::GatewayState},
    gateway::{session, AuthError},
};

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct SignInRequest {
    #[serde(rename = "rememberMe", default)]
    remember_me: bool,
}

#[utoipa::path(
    post,
    path = "/auth/sign-in",
    request_body = SignInRequest,
    responses (
        (status = 200, description = "Signed in; user fields in the body, token in the `token` cookie"),
        (status = 401, description = "Credentials rejected", body = crate::api::error::ErrorBody),
        (status = 502, description = "Upstream service unreachable", body = crate::api::error::ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip(state, headers, payload))]
pub async fn sign_in(
    state: Extension<Arc<GatewayState>>,
    headers: HeaderMap,
    payload: Option<Json<SignInRequest>>,
) -> Result<Response, ApiError> {
    let Some(credentials) = parse_basic_auth(&headers) else {
        debug!("missing or malformed basic credentials");
        return Err(AuthError::Unauthorized.into());
    };
    let request = payload.map(|Json(request)| request).unwrap_or_default();

    let (identity, policy) = state
        .broker
        .authenticate_basic(&credentials, request.remember_me)
        .await?;

    let cookie = session::issue(&identity, policy.remember_me, state.dev);

    let mut response = (StatusCode::OK, Json(Value::Object(identity.user))).into_response();
    if let Some(value) = cookie_header(&cookie.header_value()) {
        response.headers_mut().insert(SET_COOKIE, value);
    }
    Ok(response)
}
