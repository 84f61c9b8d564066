//! Signed `oauth_flow` cookie that carries handshake state from the consent redirect
//! to the provider callback.
//!
//! The cookie value is `<base64url(json)>.<hex(hmac-sha256)>`, keyed by the session
//! secret. Nothing is stored server-side.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

use super::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

pub const FLOW_COOKIE_NAME: &str = "oauth_flow";
pub const FLOW_MAX_AGE_SECONDS: u64 = 600;

/// Handshake state pinned to a single consent redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowState {
    pub provider: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pkce_verifier: Option<String>,
    #[serde(default)]
    pub remember_me: bool,
    pub issued_at: u64,
}

impl FlowState {
    #[must_use]
    pub fn new(
        provider: impl Into<String>,
        state: impl Into<String>,
        pkce_verifier: Option<String>,
        remember_me: bool,
    ) -> Self {
        Self {
            provider: provider.into(),
            state: state.into(),
            pkce_verifier,
            remember_me,
            issued_at: unix_now(),
        }
    }
}

#[derive(Clone)]
pub struct FlowSigner {
    secret: SecretString,
}

impl FlowSigner {
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    fn mac(&self) -> Result<HmacSha256, hmac::digest::InvalidLength> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
    }

    /// Serialize and sign a flow state into a cookie value.
    ///
    /// # Errors
    /// Returns an error if the state cannot be serialized or the key is rejected.
    pub fn seal(&self, flow: &FlowState) -> anyhow::Result<String> {
        let payload = Base64UrlUnpadded::encode_string(&serde_json::to_vec(flow)?);
        let mut mac = self
            .mac()
            .map_err(|e| anyhow::anyhow!("invalid flow key: {e}"))?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    /// Verify and decode a cookie value issued by [`Self::seal`].
    ///
    /// # Errors
    /// Returns `Unauthorized` for malformed, tampered or expired values.
    pub fn open(&self, value: &str) -> Result<FlowState, AuthError> {
        self.open_at(value, unix_now())
    }

    /// Same as [`Self::open`] with an explicit clock.
    ///
    /// # Errors
    /// Returns `Unauthorized` for malformed, tampered or expired values.
    pub fn open_at(&self, value: &str, now: u64) -> Result<FlowState, AuthError> {
        let (payload, signature) = value.split_once('.').ok_or(AuthError::Unauthorized)?;
        let signature = hex::decode(signature).map_err(|_| AuthError::Unauthorized)?;

        let mut mac = self.mac().map_err(|_| AuthError::Unauthorized)?;
        mac.update(payload.as_bytes());
        if mac.verify_slice(&signature).is_err() {
            warn!("oauth flow cookie signature mismatch");
            return Err(AuthError::Unauthorized);
        }

        let json = Base64UrlUnpadded::decode_vec(payload).map_err(|_| AuthError::Unauthorized)?;
        let flow: FlowState =
            serde_json::from_slice(&json).map_err(|_| AuthError::Unauthorized)?;

        if now.saturating_sub(flow.issued_at) > FLOW_MAX_AGE_SECONDS {
            warn!("oauth flow cookie expired");
            return Err(AuthError::Unauthorized);
        }

        Ok(flow)
    }
}

impl std::fmt::Debug for FlowSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowSigner").field("secret", &"***").finish()
    }
}

/// `Set-Cookie` value for a sealed flow state.
#[must_use]
pub fn flow_cookie(sealed: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{FLOW_COOKIE_NAME}={sealed}; Path=/auth; HttpOnly; SameSite=Lax; Max-Age={FLOW_MAX_AGE_SECONDS}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[must_use]
pub fn clear_flow_cookie(secure: bool) -> String {
    let mut cookie = format!("{FLOW_COOKIE_NAME}=; Path=/auth; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}
