use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use super::{relay, valid_email};
use crate::api::{
    error::{invalid_request, ApiError},
    state::GatewayState,
};

/// Registration fields are forwarded as-is; only `email` is checked locally.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SignUpRequest {
    email: String,
}

#[utoipa::path(
    post,
    path = "/auth/sign-up",
    request_body = SignUpRequest,
    responses (
        (status = 201, description = "User created"),
        (status = 400, description = "Missing payload or invalid email", body = crate::api::error::ErrorBody),
        (status = 502, description = "Upstream service unreachable", body = crate::api::error::ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip(state, payload))]
pub async fn sign_up(
    state: Extension<Arc<GatewayState>>,
    payload: Option<Json<Map<String, Value>>>,
) -> Result<Response, ApiError> {
    let Some(Json(mut user)) = payload else {
        return Ok(invalid_request("Missing payload"));
    };

    let email = user
        .get("email")
        .and_then(Value::as_str)
        .map(|email| email.trim().to_lowercase());
    let Some(email) = email.filter(|email| valid_email(email)) else {
        debug!("rejecting sign-up without a valid email");
        return Ok(invalid_request("Invalid email"));
    };
    user.insert("email".to_string(), Value::String(email));

    let reply = state
        .broker
        .upstream()
        .sign_up(user, state.broker.api_key())
        .await?;

    if reply.status.is_success() {
        info!("user created");
        return Ok((StatusCode::CREATED, Json(json!({"message": "user created"}))).into_response());
    }

    debug!("upstream refused sign-up: {}", reply.status);
    Ok(relay(reply))
}
