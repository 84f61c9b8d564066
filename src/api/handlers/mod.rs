//! Route handlers and the request helpers they share.

pub mod health;
pub mod provider;
pub mod sign_in;
pub mod sign_out;
pub mod sign_up;
pub mod user_movies;

use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, COOKIE},
        HeaderMap, HeaderValue,
    },
    response::{IntoResponse, Response},
};
use base64ct::{Base64, Encoding};
use regex::Regex;
use tracing::error;

use crate::gateway::{upstream::UpstreamReply, Credentials};

/// Lightweight email sanity check applied before anything is forwarded upstream.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Value of the named cookie from the request `Cookie` header.
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| val.trim().to_string())
        })
        .filter(|value| !value.is_empty())
}

/// Decode `Authorization: Basic <base64(identifier:secret)>`.
pub fn parse_basic_auth(headers: &HeaderMap) -> Option<Credentials> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = Base64::decode_vec(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (identifier, secret) = decoded.split_once(':')?;
    if identifier.is_empty() {
        return None;
    }

    Some(Credentials::new(identifier, secret))
}

/// Turn a `Set-Cookie` string into a header value, logging malformed input.
pub(crate) fn cookie_header(cookie: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(cookie)
        .map_err(|err| error!("Failed to build cookie header: {err}"))
        .ok()
}

/// Relay an upstream answer unchanged.
pub(crate) fn relay(reply: UpstreamReply) -> Response {
    let mut response = (reply.status, Body::from(reply.body)).into_response();
    if let Some(value) = reply
        .content_type
        .and_then(|content_type| HeaderValue::from_str(&content_type).ok())
    {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    response
}
