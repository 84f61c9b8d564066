//! Identity records exchanged between the route layer, the adapters and the upstream service.

use secrecy::SecretString;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use super::error::AuthError;

/// A username/password pair; lives only for a single verification call.
pub struct Credentials {
    pub identifier: String,
    pub secret: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: SecretString::from(secret.into()),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"***")
            .finish()
    }
}

/// Canonical shape every provider profile is mapped into.
///
/// `email` is always populated and `external_id` is the provider's stable subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedIdentity {
    pub display_name: String,
    pub email: String,
    pub external_id: String,
}

/// Identity returned by the upstream service after a successful verification.
#[derive(Clone, PartialEq)]
pub struct UpstreamIdentity {
    pub token: String,
    pub user: Map<String, Value>,
}

impl UpstreamIdentity {
    /// Decode a successful upstream body.
    ///
    /// The token is lifted out of the payload. User fields are taken from a nested `user`
    /// object when the upstream wraps them, otherwise from the remaining top-level fields.
    /// An empty body, a non-object body or a missing token is treated as a rejection, and
    /// so is a token that cannot be carried verbatim in the `token` cookie.
    ///
    /// # Errors
    /// Returns `Unauthorized` for any of the rejected shapes above.
    pub fn from_body(body: &[u8]) -> Result<Self, AuthError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(AuthError::Unauthorized);
        }

        let Ok(Value::Object(mut fields)) = serde_json::from_slice::<Value>(body) else {
            return Err(AuthError::Unauthorized);
        };

        let token = match fields.remove("token") {
            Some(Value::String(token)) if is_cookie_value(&token) => token,
            Some(Value::String(_)) => {
                warn!("upstream token is not a valid cookie value");
                return Err(AuthError::Unauthorized);
            }
            _ => return Err(AuthError::Unauthorized),
        };

        let user = match fields.remove("user") {
            Some(Value::Object(user)) => user,
            Some(other) => {
                fields.insert("user".to_string(), other);
                fields
            }
            None => fields,
        };

        Ok(Self { token, user })
    }
}

/// RFC 6265 `cookie-octet`: visible ASCII except `"`, `,`, `;` and `\`.
fn is_cookie_value(token: &str) -> bool {
    !token.is_empty()
        && token
            .bytes()
            .all(|b| b.is_ascii_graphic() && !matches!(b, b'"' | b',' | b';' | b'\\'))
}

impl std::fmt::Debug for UpstreamIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamIdentity")
            .field("token", &"***")
            .field("user", &self.user)
            .finish()
    }
}
