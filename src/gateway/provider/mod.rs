//! Provider adapters.
//!
//! One [`ProviderAdapter`] exists per configured identity provider. The only
//! provider-specific logic is how a user-info document maps to a
//! [`NormalizedIdentity`]; the handshake, the profile fetch and the upstream
//! exchange are shared. Adapters are built once at start-up and collected in a
//! [`ProviderRegistry`] that the broker borrows for every request.

pub mod oauth;
pub mod profile;

use secrecy::{ExposeSecret, SecretString};
use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    str::FromStr,
};
use tracing::{debug, instrument, warn};
use url::Url;

use super::{
    error::AuthError,
    identity::{NormalizedIdentity, UpstreamIdentity},
    upstream::UpstreamClient,
};
pub use oauth::ConsentRedirect;
pub use profile::ProviderProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderKind {
    Google,
    Facebook,
    LinkedIn,
    Twitter,
    /// Generic OAuth2 provider with configurable endpoints.
    OAuth2,
}

impl ProviderKind {
    pub const ALL: [Self; 5] = [
        Self::Google,
        Self::Facebook,
        Self::LinkedIn,
        Self::Twitter,
        Self::OAuth2,
    ];

    /// Route name of the provider, as in `/auth/{name}`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Facebook => "facebook",
            Self::LinkedIn => "linkedin",
            Self::Twitter => "twitter",
            Self::OAuth2 => "google-oauth",
        }
    }

    /// Domain used to synthesize an email when the profile carries none.
    #[must_use]
    pub const fn email_domain(self) -> &'static str {
        match self {
            Self::Google => "google.com",
            Self::Facebook => "facebook.com",
            Self::LinkedIn => "linkedin.com",
            Self::Twitter => "twitter.com",
            Self::OAuth2 => "oauth.com",
        }
    }

    #[must_use]
    pub const fn default_scopes(self) -> &'static [&'static str] {
        match self {
            Self::Google | Self::OAuth2 => &["openid", "email", "profile"],
            Self::Facebook => &["email", "public_profile"],
            Self::LinkedIn => &["openid", "profile", "email"],
            Self::Twitter => &["users.read", "tweet.read"],
        }
    }

    /// Twitter only accepts authorization-code grants protected by PKCE.
    #[must_use]
    pub const fn requires_pkce(self) -> bool {
        matches!(self, Self::Twitter)
    }

    #[must_use]
    pub fn callback_path(self) -> String {
        format!("/auth/{}/callback", self.name())
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = AuthError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| AuthError::UnknownProvider(name.to_string()))
    }
}

/// Static per-provider record, loaded once at start-up.
#[derive(Clone)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub callback_path: String,
    pub scopes: BTreeSet<String>,
}

impl ProviderConfig {
    #[must_use]
    pub fn new(kind: ProviderKind, client_id: String, client_secret: SecretString) -> Self {
        Self {
            client_id,
            client_secret,
            callback_path: kind.callback_path(),
            scopes: kind
                .default_scopes()
                .iter()
                .map(|scope| (*scope).to_string())
                .collect(),
        }
    }

    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("callback_path", &self.callback_path)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Consent, token and user-info endpoints of a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub authorize_url: Url,
    pub token_url: Url,
    pub userinfo_url: Url,
}

impl ProviderEndpoints {
    /// Public endpoints of the well-known providers.
    ///
    /// # Errors
    /// Returns an error only if a built-in endpoint fails to parse.
    pub fn for_kind(kind: ProviderKind) -> Result<Self, url::ParseError> {
        let (authorize, token, userinfo) = match kind {
            ProviderKind::Google => (
                "https://accounts.google.com/o/oauth2/v2/auth",
                "https://oauth2.googleapis.com/token",
                "https://www.googleapis.com/oauth2/v2/userinfo",
            ),
            ProviderKind::Facebook => (
                "https://www.facebook.com/v19.0/dialog/oauth",
                "https://graph.facebook.com/v19.0/oauth/access_token",
                "https://graph.facebook.com/me?fields=id,name,email",
            ),
            ProviderKind::LinkedIn => (
                "https://www.linkedin.com/oauth/v2/authorization",
                "https://www.linkedin.com/oauth/v2/accessToken",
                "https://api.linkedin.com/v2/userinfo",
            ),
            ProviderKind::Twitter => (
                "https://twitter.com/i/oauth2/authorize",
                "https://api.twitter.com/2/oauth2/token",
                "https://api.twitter.com/2/users/me",
            ),
            ProviderKind::OAuth2 => (
                "https://accounts.google.com/o/oauth2/v2/auth",
                "https://oauth2.googleapis.com/token",
                "https://www.googleapis.com/oauth2/v3/userinfo",
            ),
        };

        Ok(Self {
            authorize_url: Url::parse(authorize)?,
            token_url: Url::parse(token)?,
            userinfo_url: Url::parse(userinfo)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ProviderAdapter {
    kind: ProviderKind,
    config: ProviderConfig,
    endpoints: ProviderEndpoints,
    redirect_url: Url,
    upstream: UpstreamClient,
}

impl ProviderAdapter {
    /// # Errors
    /// Returns an error if the callback path cannot be joined onto `public_url`.
    pub fn new(
        kind: ProviderKind,
        config: ProviderConfig,
        endpoints: ProviderEndpoints,
        public_url: &Url,
        upstream: UpstreamClient,
    ) -> Result<Self, url::ParseError> {
        let redirect_url = callback_url(public_url, &config.callback_path)?;
        Ok(Self {
            kind,
            config,
            endpoints,
            redirect_url,
            upstream,
        })
    }

    #[must_use]
    pub const fn kind(&self) -> ProviderKind {
        self.kind
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.kind.name()
    }

    #[must_use]
    pub const fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Absolute callback URL registered with the provider.
    #[must_use]
    pub const fn redirect_url(&self) -> &Url {
        &self.redirect_url
    }

    /// Map a raw profile of this provider to the canonical identity.
    ///
    /// # Errors
    /// Returns `ProviderProtocolError` if the profile belongs to another provider.
    pub fn normalize(&self, profile: &ProviderProfile) -> Result<NormalizedIdentity, AuthError> {
        if profile.kind() != self.kind {
            return Err(AuthError::ProviderProtocolError(format!(
                "{} profile handed to the {} adapter",
                profile.kind(),
                self.kind
            )));
        }
        Ok(profile.normalize())
    }

    /// Exchange a normalized identity at the upstream "sign via provider" endpoint.
    pub async fn exchange(
        &self,
        identity: &NormalizedIdentity,
        api_key: &SecretString,
    ) -> Result<UpstreamIdentity, AuthError> {
        self.upstream.sign_provider(identity, api_key).await
    }

    /// Load the signed-in user's profile from the provider's user-info endpoint.
    #[instrument(skip(self, access_token), fields(provider = %self.kind))]
    pub async fn fetch_profile(
        &self,
        access_token: &SecretString,
    ) -> Result<ProviderProfile, AuthError> {
        let response = self
            .upstream
            .http()
            .get(self.endpoints.userinfo_url.clone())
            .bearer_auth(access_token.expose_secret())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("provider refused user-info request: {status}");
            return Err(AuthError::Unauthorized);
        }

        let body = response.bytes().await?;
        let profile = ProviderProfile::parse(self.kind, &body)?;

        debug!("fetched provider profile");

        Ok(profile)
    }
}

/// Join a callback path under `public_url`, keeping any path prefix it carries
/// (`https://x.com/gw` and `https://x.com/gw/` both yield `https://x.com/gw/auth/...`).
fn callback_url(public_url: &Url, callback_path: &str) -> Result<Url, url::ParseError> {
    let mut base = public_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(callback_path.trim_start_matches('/'))
}

/// Mapping from provider route name to its adapter, constructed once.
#[derive(Debug, Default, Clone)]
pub struct ProviderRegistry {
    adapters: HashMap<&'static str, ProviderAdapter>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new(adapters: impl IntoIterator<Item = ProviderAdapter>) -> Self {
        Self {
            adapters: adapters
                .into_iter()
                .map(|adapter| (adapter.name(), adapter))
                .collect(),
        }
    }

    /// # Errors
    /// Returns `UnknownProvider` when no adapter is registered under `name`.
    pub fn get(&self, name: &str) -> Result<&ProviderAdapter, AuthError> {
        self.adapters
            .get(name)
            .ok_or_else(|| AuthError::UnknownProvider(name.to_string()))
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.adapters.keys().copied().collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
