use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;

use super::cookie_header;
use crate::{api::state::GatewayState, gateway::SessionCookie};

#[utoipa::path(
    post,
    path = "/auth/sign-out",
    responses (
        (status = 204, description = "Session cookie cleared"),
    ),
    tag = "auth"
)]
pub async fn sign_out(state: Extension<Arc<GatewayState>>) -> impl IntoResponse {
    // Nothing is stored server-side, so clearing the cookie is the whole sign-out.
    let mut headers = HeaderMap::new();
    if let Some(value) = cookie_header(&SessionCookie::cleared(state.dev).header_value()) {
        headers.insert(SET_COOKIE, value);
    }
    (StatusCode::NO_CONTENT, headers)
}
