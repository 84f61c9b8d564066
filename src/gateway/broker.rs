//! Identity broker: routes an authentication attempt to the credential verifier or to
//! the matching provider adapter and returns the upstream identity.
//!
//! The broker keeps no per-request state; its provider registry and API key are fixed
//! at start-up and shared across requests.

use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{
    error::AuthError,
    identity::{Credentials, UpstreamIdentity},
    provider::{ConsentRedirect, ProviderAdapter, ProviderProfile, ProviderRegistry},
    session::SessionPolicy,
    upstream::UpstreamClient,
};

#[derive(Debug, Clone)]
pub struct IdentityBroker {
    upstream: UpstreamClient,
    providers: Arc<ProviderRegistry>,
    api_key: SecretString,
}

impl IdentityBroker {
    #[must_use]
    pub fn new(upstream: UpstreamClient, providers: ProviderRegistry, api_key: SecretString) -> Self {
        Self {
            upstream,
            providers: Arc::new(providers),
            api_key,
        }
    }

    #[must_use]
    pub const fn upstream(&self) -> &UpstreamClient {
        &self.upstream
    }

    #[must_use]
    pub const fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    #[must_use]
    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// # Errors
    /// Returns `UnknownProvider` when `name` is not configured.
    pub fn provider(&self, name: &str) -> Result<&ProviderAdapter, AuthError> {
        self.providers.get(name)
    }

    /// Verify a username/password pair and attach the requested session policy.
    #[instrument(skip(self, credentials), fields(identifier = %credentials.identifier))]
    pub async fn authenticate_basic(
        &self,
        credentials: &Credentials,
        remember_me: bool,
    ) -> Result<(UpstreamIdentity, SessionPolicy), AuthError> {
        let identity = self.upstream.verify(credentials, &self.api_key).await?;
        info!("basic sign-in accepted");
        Ok((identity, SessionPolicy { remember_me }))
    }

    /// Normalize a raw provider profile and exchange it upstream.
    #[instrument(skip(self, profile))]
    pub async fn authenticate_provider(
        &self,
        provider_name: &str,
        profile: &ProviderProfile,
    ) -> Result<UpstreamIdentity, AuthError> {
        let adapter = self.providers.get(provider_name)?;
        let identity = adapter.normalize(profile)?;

        debug!(email = %identity.email, "normalized provider identity");

        let upstream = adapter.exchange(&identity, &self.api_key).await?;
        info!("provider sign-in accepted");
        Ok(upstream)
    }

    /// Start the redirect flow for a provider.
    ///
    /// # Errors
    /// Returns `UnknownProvider` when `provider_name` is not configured.
    pub fn authorize(&self, provider_name: &str) -> Result<ConsentRedirect, AuthError> {
        Ok(self.providers.get(provider_name)?.authorize())
    }

    /// Finish the redirect flow: redeem the code, load the profile, then exchange it.
    #[instrument(skip(self, code, pkce_verifier))]
    pub async fn authenticate_callback(
        &self,
        provider_name: &str,
        code: &str,
        pkce_verifier: Option<String>,
    ) -> Result<UpstreamIdentity, AuthError> {
        let adapter = self.providers.get(provider_name)?;
        let access_token = adapter.exchange_code(code, pkce_verifier).await?;
        let profile = adapter.fetch_profile(&access_token).await?;
        self.authenticate_provider(provider_name, &profile).await
    }
}
