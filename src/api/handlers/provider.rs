//! `GET /auth/{provider}` and `GET /auth/{provider}/callback`.

use axum::{
    extract::{Extension, Path, Query},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};
use utoipa::IntoParams;

use super::{cookie_header, extract_cookie};
use crate::{
    api::{error::ApiError, state::GatewayState},
    gateway::{
        flow::{clear_flow_cookie, flow_cookie, FlowState, FLOW_COOKIE_NAME},
        session, AuthError,
    },
};

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct AuthorizeParams {
    /// Extend the session to 30 days once the provider signs the user in.
    #[serde(rename = "rememberMe", default)]
    remember_me: bool,
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

#[utoipa::path(
    get,
    path = "/auth/{provider}",
    params(
        ("provider" = String, Path, description = "google, facebook, linkedin, twitter or google-oauth"),
        AuthorizeParams,
    ),
    responses (
        (status = 303, description = "Redirect to the provider consent screen"),
        (status = 401, description = "Provider not configured", body = crate::api::error::ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip(state))]
pub async fn authorize(
    state: Extension<Arc<GatewayState>>,
    Path(provider): Path<String>,
    Query(params): Query<AuthorizeParams>,
) -> Result<Response, ApiError> {
    let consent = state.broker.authorize(&provider)?;

    let flow = FlowState::new(
        provider,
        consent.state,
        consent.pkce_verifier,
        params.remember_me,
    );
    let sealed = match state.flow.seal(&flow) {
        Ok(sealed) => sealed,
        Err(err) => {
            error!("Failed to seal oauth flow state: {err}");
            return Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error starting sign-in".to_string(),
            )
                .into_response());
        }
    };

    let mut response = Redirect::to(consent.url.as_str()).into_response();
    if let Some(value) = cookie_header(&flow_cookie(&sealed, state.secure_cookies())) {
        response.headers_mut().insert(SET_COOKIE, value);
    }

    debug!("redirecting to provider consent screen");

    Ok(response)
}

#[utoipa::path(
    get,
    path = "/auth/{provider}/callback",
    params(
        ("provider" = String, Path, description = "Provider that issued the redirect"),
        CallbackParams,
    ),
    responses (
        (status = 200, description = "Signed in; user fields in the body, token in the `token` cookie"),
        (status = 401, description = "No authenticated principal", body = crate::api::error::ErrorBody),
        (status = 400, description = "Provider answered with an unreadable payload", body = crate::api::error::ErrorBody),
        (status = 502, description = "Provider or upstream unreachable", body = crate::api::error::ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip(state, headers, params))]
pub async fn callback(
    state: Extension<Arc<GatewayState>>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Response {
    let mut response = match complete(&state, &provider, params, &headers).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    };

    // The flow cookie is single use, whatever the outcome.
    if let Some(value) = cookie_header(&clear_flow_cookie(state.secure_cookies())) {
        response.headers_mut().append(SET_COOKIE, value);
    }
    response
}

async fn complete(
    state: &GatewayState,
    provider: &str,
    params: CallbackParams,
    headers: &HeaderMap,
) -> Result<Response, ApiError> {
    state.broker.provider(provider)?;

    if let Some(error) = params.error {
        warn!("provider reported an error: {error}");
        return Err(AuthError::Unauthorized.into());
    }

    let sealed = extract_cookie(headers, FLOW_COOKIE_NAME).ok_or(AuthError::Unauthorized)?;
    let flow = state.flow.open(&sealed)?;

    if flow.provider != provider {
        warn!("flow cookie issued for {}", flow.provider);
        return Err(AuthError::Unauthorized.into());
    }
    if params.state.as_deref() != Some(flow.state.as_str()) {
        warn!("state parameter mismatch");
        return Err(AuthError::Unauthorized.into());
    }
    let code = params.code.ok_or(AuthError::Unauthorized)?;

    let identity = state
        .broker
        .authenticate_callback(provider, &code, flow.pkce_verifier)
        .await?;

    let cookie = session::issue(&identity, flow.remember_me, state.dev);

    let mut response = (StatusCode::OK, Json(Value::Object(identity.user))).into_response();
    if let Some(value) = cookie_header(&cookie.header_value()) {
        response.headers_mut().insert(SET_COOKIE, value);
    }
    Ok(response)
}
