use crate::{
    api::{self, GatewayState},
    cli::commands::providers::ProviderCredentials,
    gateway::{
        flow::FlowSigner,
        provider::{ProviderAdapter, ProviderConfig, ProviderEndpoints, ProviderKind, ProviderRegistry},
        upstream::UpstreamClient,
        IdentityBroker,
    },
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};
use url::Url;

pub struct Args {
    pub port: u16,
    pub api_url: Url,
    pub api_key_token: SecretString,
    pub upstream_timeout: Duration,
    pub session_secret: SecretString,
    pub public_url: Url,
    pub dev: bool,
    pub providers: Vec<ProviderCredentials>,
    pub oauth_endpoints: ProviderEndpoints,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("api_url", &self.api_url.as_str())
            .field("api_key_token", &"***")
            .field("upstream_timeout", &self.upstream_timeout)
            .field("session_secret", &"***")
            .field("public_url", &self.public_url.as_str())
            .field("dev", &self.dev)
            .field("providers", &self.providers)
            .field("oauth_endpoints", &self.oauth_endpoints)
            .finish()
    }
}

/// Wire the upstream client, the provider registry and the broker into handler state.
///
/// # Errors
/// Returns an error if the HTTP client cannot be built or a redirect URL is invalid.
pub fn build_state(args: Args) -> Result<Arc<GatewayState>> {
    let upstream = UpstreamClient::new(args.api_url, args.upstream_timeout)
        .context("Failed to build upstream HTTP client")?;

    let mut adapters = Vec::with_capacity(args.providers.len());
    for credentials in args.providers {
        let kind = credentials.kind;
        let endpoints = if kind == ProviderKind::OAuth2 {
            args.oauth_endpoints.clone()
        } else {
            ProviderEndpoints::for_kind(kind)?
        };
        let config = ProviderConfig::new(kind, credentials.client_id, credentials.client_secret);
        let adapter = ProviderAdapter::new(kind, config, endpoints, &args.public_url, upstream.clone())
            .with_context(|| format!("Invalid redirect URL for provider {kind}"))?;

        debug!("Provider {} redirects to {}", kind, adapter.redirect_url());

        adapters.push(adapter);
    }

    let registry = ProviderRegistry::new(adapters);
    if registry.is_empty() {
        warn!("No identity providers configured; only basic sign-in is available");
    } else {
        info!("Identity providers: {}", registry.names().join(", "));
    }

    let broker = IdentityBroker::new(upstream, registry, args.api_key_token);

    Ok(Arc::new(GatewayState::new(
        broker,
        FlowSigner::new(args.session_secret),
        args.public_url,
        args.dev,
    )))
}

/// Execute the server action.
/// # Errors
/// Returns an error if the state cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    if args.dev {
        warn!("Development mode: session cookies are sent without HttpOnly and Secure");
    }

    let port = args.port;
    let state = build_state(args)?;

    api::serve(port, state).await
}
