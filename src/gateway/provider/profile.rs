//! Provider-specific user-info shapes and their mapping to a [`NormalizedIdentity`].

use serde::Deserialize;

use super::ProviderKind;
use crate::gateway::{error::AuthError, identity::NormalizedIdentity};

/// `GET https://www.googleapis.com/oauth2/v2/userinfo`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GoogleProfile {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// `GET https://graph.facebook.com/me?fields=id,name,email`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FacebookProfile {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// `GET https://api.linkedin.com/v2/userinfo` (OpenID Connect claims)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LinkedInProfile {
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// `GET https://api.twitter.com/2/users/me`, unwrapped from its `data` envelope.
///
/// Twitter never discloses an email through this endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TwitterProfile {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub username: String,
}

#[derive(Deserialize)]
struct TwitterEnvelope {
    data: TwitterProfile,
}

/// Generic user-info document reduced to `{id, name, email}`; `id` is read from `sub`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OAuth2Profile {
    #[serde(rename = "sub")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Raw profile as returned by one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderProfile {
    Google(GoogleProfile),
    Facebook(FacebookProfile),
    LinkedIn(LinkedInProfile),
    Twitter(TwitterProfile),
    OAuth2(OAuth2Profile),
}

impl ProviderProfile {
    /// Decode a user-info body for the given provider.
    ///
    /// # Errors
    /// Returns `ProviderProtocolError` when the body does not match the provider's schema.
    pub fn parse(kind: ProviderKind, body: &[u8]) -> Result<Self, AuthError> {
        let decoded = match kind {
            ProviderKind::Google => serde_json::from_slice(body).map(Self::Google),
            ProviderKind::Facebook => serde_json::from_slice(body).map(Self::Facebook),
            ProviderKind::LinkedIn => serde_json::from_slice(body).map(Self::LinkedIn),
            ProviderKind::Twitter => serde_json::from_slice::<TwitterEnvelope>(body)
                .map(|envelope| Self::Twitter(envelope.data)),
            ProviderKind::OAuth2 => serde_json::from_slice(body).map(Self::OAuth2),
        };

        decoded.map_err(|e| AuthError::ProviderProtocolError(format!("{kind} profile: {e}")))
    }

    #[must_use]
    pub const fn kind(&self) -> ProviderKind {
        match self {
            Self::Google(_) => ProviderKind::Google,
            Self::Facebook(_) => ProviderKind::Facebook,
            Self::LinkedIn(_) => ProviderKind::LinkedIn,
            Self::Twitter(_) => ProviderKind::Twitter,
            Self::OAuth2(_) => ProviderKind::OAuth2,
        }
    }

    /// Map the profile into the canonical identity.
    ///
    /// Missing emails are synthesized as `<username-or-id>@<provider-domain>` and a
    /// missing display name falls back to the same local part.
    #[must_use]
    pub fn normalize(&self) -> NormalizedIdentity {
        let (external_id, local_part, name, email) = match self {
            Self::Google(p) => (&*p.id, &*p.id, p.name.as_deref(), p.email.as_deref()),
            Self::Facebook(p) => (&*p.id, &*p.id, p.name.as_deref(), p.email.as_deref()),
            Self::LinkedIn(p) => (&*p.sub, &*p.sub, p.name.as_deref(), p.email.as_deref()),
            Self::Twitter(p) => (&*p.id, &*p.username, p.name.as_deref(), None),
            Self::OAuth2(p) => (&*p.id, &*p.id, p.name.as_deref(), p.email.as_deref()),
        };

        let email = present(email).map_or_else(
            || format!("{local_part}@{}", self.kind().email_domain()),
            str::to_string,
        );
        let display_name = present(name).unwrap_or(local_part).to_string();

        NormalizedIdentity {
            display_name,
            email,
            external_id: external_id.to_string(),
        }
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
