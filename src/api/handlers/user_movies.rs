//! Pass-through proxy for the signed-in user's movie list.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, Method},
    response::Response,
    Json,
};
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

use super::{extract_cookie, relay};
use crate::{
    api::{
        error::{invalid_request, ApiError},
        state::GatewayState,
    },
    gateway::{session::TOKEN_COOKIE_NAME, upstream::USER_MOVIES_PATH, AuthError},
};

fn valid_id(id: &str) -> bool {
    Regex::new(r"^[A-Za-z0-9_-]+$").is_ok_and(|re| re.is_match(id))
}

#[utoipa::path(
    post,
    path = "/user-movies",
    responses (
        (status = 201, description = "Relayed upstream answer"),
        (status = 401, description = "Missing `token` cookie", body = crate::api::error::ErrorBody),
        (status = 502, description = "Upstream service unreachable", body = crate::api::error::ErrorBody),
    ),
    tag = "user-movies"
)]
#[instrument(skip(state, headers, payload))]
pub async fn create(
    state: Extension<Arc<GatewayState>>,
    headers: HeaderMap,
    payload: Option<Json<Value>>,
) -> Result<Response, ApiError> {
    let token = extract_cookie(&headers, TOKEN_COOKIE_NAME).ok_or(AuthError::Unauthorized)?;
    let body = payload.map(|Json(body)| body);

    let reply = state
        .broker
        .upstream()
        .forward(Method::POST, USER_MOVIES_PATH, &token, body.as_ref())
        .await?;
    Ok(relay(reply))
}

#[utoipa::path(
    delete,
    path = "/user-movies/{id}",
    params(("id" = String, Path, description = "User-movie identifier")),
    responses (
        (status = 200, description = "Relayed upstream answer"),
        (status = 400, description = "Malformed identifier", body = crate::api::error::ErrorBody),
        (status = 401, description = "Missing `token` cookie", body = crate::api::error::ErrorBody),
        (status = 502, description = "Upstream service unreachable", body = crate::api::error::ErrorBody),
    ),
    tag = "user-movies"
)]
#[instrument(skip(state, headers))]
pub async fn delete(
    state: Extension<Arc<GatewayState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = extract_cookie(&headers, TOKEN_COOKIE_NAME).ok_or(AuthError::Unauthorized)?;

    if !valid_id(&id) {
        return Ok(invalid_request("Invalid id"));
    }

    let reply = state
        .broker
        .upstream()
        .forward(
            Method::DELETE,
            &format!("{USER_MOVIES_PATH}/{id}"),
            &token,
            None,
        )
        .await?;
    Ok(relay(reply))
}
