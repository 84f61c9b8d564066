//! Authorization-code handshake shared by every adapter.

use oauth2::{
    basic::BasicClient, AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl,
    RequestTokenError, Scope, TokenResponse, TokenUrl,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument, warn};
use url::Url;

use super::{ProviderAdapter, ProviderKind};
use crate::gateway::error::AuthError;

type ConfiguredClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Consent URL plus the values that must survive until the callback.
#[derive(Debug)]
pub struct ConsentRedirect {
    pub url: Url,
    pub state: String,
    pub pkce_verifier: Option<String>,
}

/// Facebook and LinkedIn expect the client credentials in the form body.
const fn auth_type(kind: ProviderKind) -> AuthType {
    match kind {
        ProviderKind::Facebook | ProviderKind::LinkedIn => AuthType::RequestBody,
        ProviderKind::Google | ProviderKind::Twitter | ProviderKind::OAuth2 => AuthType::BasicAuth,
    }
}

impl ProviderAdapter {
    fn oauth_client(&self) -> ConfiguredClient {
        BasicClient::new(ClientId::new(self.config.client_id.clone()))
            .set_client_secret(ClientSecret::new(
                self.config.client_secret.expose_secret().to_string(),
            ))
            .set_auth_uri(AuthUrl::from_url(self.endpoints.authorize_url.clone()))
            .set_token_uri(TokenUrl::from_url(self.endpoints.token_url.clone()))
            .set_redirect_uri(RedirectUrl::from_url(self.redirect_url.clone()))
            .set_auth_type(auth_type(self.kind))
    }

    /// Build the provider consent URL with a fresh CSRF state and, when required, a
    /// PKCE S256 challenge.
    #[must_use]
    pub fn authorize(&self) -> ConsentRedirect {
        let client = self.oauth_client();
        let mut request = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.config.scopes.iter().cloned().map(Scope::new));

        let pkce_verifier = if self.kind.requires_pkce() {
            let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
            request = request.set_pkce_challenge(challenge);
            Some(verifier.secret().clone())
        } else {
            None
        };

        let (url, state) = request.url();

        ConsentRedirect {
            url,
            state: state.secret().clone(),
            pkce_verifier,
        }
    }

    /// Redeem an authorization code at the provider token endpoint.
    ///
    /// # Errors
    /// A refused code is `Unauthorized`, an unreachable provider is
    /// `UpstreamUnavailable` and an unreadable token response is `ProviderProtocolError`.
    #[instrument(skip(self, code, pkce_verifier), fields(provider = %self.kind))]
    pub async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: Option<String>,
    ) -> Result<SecretString, AuthError> {
        let client = self.oauth_client();
        let mut request = client.exchange_code(AuthorizationCode::new(code.to_string()));
        if let Some(verifier) = pkce_verifier {
            request = request.set_pkce_verifier(PkceCodeVerifier::new(verifier));
        }

        let token = request
            .request_async(self.upstream.http())
            .await
            .map_err(|err| match err {
                RequestTokenError::ServerResponse(response) => {
                    warn!("provider refused authorization code: {}", response.error());
                    AuthError::Unauthorized
                }
                RequestTokenError::Request(e) => AuthError::UpstreamUnavailable(e.to_string()),
                RequestTokenError::Parse(e, _) => {
                    AuthError::ProviderProtocolError(format!("token response: {e}"))
                }
                RequestTokenError::Other(message) => AuthError::ProviderProtocolError(message),
            })?;

        debug!("authorization code redeemed");

        Ok(SecretString::from(token.access_token().secret().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::adapter_for;
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use wiremock::{
        matchers::{body_string_contains, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn query(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    #[tokio::test]
    async fn authorize_url_carries_client_scopes_and_state() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        let adapter = adapter_for(ProviderKind::Google, &server)?;

        let consent = adapter.authorize();
        let params = query(&consent.url);

        assert_eq!(consent.url.path(), "/authorize");
        assert_eq!(params.get("client_id").map(String::as_str), Some("client-id"));
        assert_eq!(params.get("response_type").map(String::as_str), Some("code"));
        assert_eq!(params.get("state"), Some(&consent.state));
        assert_eq!(
            params.get("redirect_uri").map(String::as_str),
            Some("https://gate.example.com/auth/google/callback")
        );
        assert!(params
            .get("scope")
            .is_some_and(|scope| scope.split(' ').any(|s| s == "email")));
        assert!(consent.pkce_verifier.is_none());
        assert!(!params.contains_key("code_challenge"));
        Ok(())
    }

    #[tokio::test]
    async fn twitter_authorize_adds_pkce_challenge() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        let adapter = adapter_for(ProviderKind::Twitter, &server)?;

        let consent = adapter.authorize();
        let params = query(&consent.url);

        assert!(consent.pkce_verifier.is_some());
        assert_eq!(
            params.get("code_challenge_method").map(String::as_str),
            Some("S256")
        );
        assert!(params.contains_key("code_challenge"));
        Ok(())
    }

    #[tokio::test]
    async fn states_differ_between_requests() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        let adapter = adapter_for(ProviderKind::Facebook, &server)?;
        assert_ne!(adapter.authorize().state, adapter.authorize().state);
        Ok(())
    }

    #[tokio::test]
    async fn exchange_code_returns_access_token() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("code=auth-code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "provider-token",
                "token_type": "bearer",
                "expires_in": 3600,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = adapter_for(ProviderKind::Google, &server)?;
        let token = adapter.exchange_code("auth-code", None).await?;
        assert_eq!(token.expose_secret(), "provider-token");
        Ok(())
    }

    #[tokio::test]
    async fn exchange_code_sends_pkce_verifier() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("code_verifier=verifier-value"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "twitter-token",
                "token_type": "bearer",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = adapter_for(ProviderKind::Twitter, &server)?;
        let token = adapter
            .exchange_code("auth-code", Some("verifier-value".to_string()))
            .await?;
        assert_eq!(token.expose_secret(), "twitter-token");
        Ok(())
    }

    #[tokio::test]
    async fn refused_code_is_unauthorized() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
            })))
            .mount(&server)
            .await;

        let adapter = adapter_for(ProviderKind::LinkedIn, &server)?;
        let result = adapter.exchange_code("stale", None).await;
        assert!(matches!(result, Err(AuthError::Unauthorized)));
        Ok(())
    }

    #[tokio::test]
    async fn garbled_token_response_is_a_protocol_error() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let adapter = adapter_for(ProviderKind::Google, &server)?;
        let result = adapter.exchange_code("code", None).await;
        assert!(matches!(result, Err(AuthError::ProviderProtocolError(_))));
        Ok(())
    }
}
