//! Client for the upstream user API that owns credentials and issues bearer tokens.

use reqwest::{header::CONTENT_TYPE, Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{
    error::AuthError,
    identity::{Credentials, NormalizedIdentity, UpstreamIdentity},
};

pub const SIGN_IN_PATH: &str = "/api/auth/sign-in";
pub const SIGN_PROVIDER_PATH: &str = "/api/auth/sign-provider";
pub const SIGN_UP_PATH: &str = "/api/auth/sign-up";
pub const USER_MOVIES_PATH: &str = "/api/user-movies";

/// Raw upstream answer relayed by the pass-through endpoints.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: Client,
    api_url: Url,
}

impl UpstreamClient {
    /// Build a client with the crate user-agent and a bounded request time.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(api_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { http, api_url })
    }

    /// Shared HTTP client, also used for provider token and user-info calls.
    #[must_use]
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// # Errors
    /// Returns an error if the joined URL does not parse.
    pub fn endpoint_url(&self, path: &str) -> Result<Url, AuthError> {
        let base = self.api_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}{path}"))
            .map_err(|e| AuthError::UpstreamUnavailable(format!("invalid upstream URL: {e}")))
    }

    /// Verify a username/password pair against the upstream sign-in endpoint.
    ///
    /// Single attempt: any status other than 200 or an empty body is `Unauthorized`,
    /// transport failures are `UpstreamUnavailable`.
    #[instrument(skip(self, credentials, api_key), fields(identifier = %credentials.identifier))]
    pub async fn verify(
        &self,
        credentials: &Credentials,
        api_key: &SecretString,
    ) -> Result<UpstreamIdentity, AuthError> {
        let url = self.endpoint_url(SIGN_IN_PATH)?;

        let response = self
            .http
            .post(url)
            .basic_auth(
                &credentials.identifier,
                Some(credentials.secret.expose_secret()),
            )
            .json(&json!({ "apiKeyToken": api_key.expose_secret() }))
            .send()
            .await?;

        identity_from_response(response).await
    }

    /// Exchange a normalized provider identity for an upstream identity.
    ///
    /// The provider subject doubles as the password-equivalent secret shared with the
    /// upstream service.
    #[instrument(skip(self, identity, api_key), fields(email = %identity.email))]
    pub async fn sign_provider(
        &self,
        identity: &NormalizedIdentity,
        api_key: &SecretString,
    ) -> Result<UpstreamIdentity, AuthError> {
        let url = self.endpoint_url(SIGN_PROVIDER_PATH)?;

        let response = self
            .http
            .post(url)
            .json(&json!({
                "name": identity.display_name,
                "email": identity.email,
                "password": identity.external_id,
                "apiKeyToken": api_key.expose_secret(),
            }))
            .send()
            .await?;

        identity_from_response(response).await
    }

    /// Forward a registration payload; the upstream status is relayed as-is.
    #[instrument(skip(self, user, api_key))]
    pub async fn sign_up(
        &self,
        mut user: Map<String, Value>,
        api_key: &SecretString,
    ) -> Result<UpstreamReply, AuthError> {
        user.insert(
            "apiKeyToken".to_string(),
            Value::String(api_key.expose_secret().to_string()),
        );
        let url = self.endpoint_url(SIGN_UP_PATH)?;
        relay(self.http.post(url).json(&user)).await
    }

    /// Forward a request on behalf of a signed-in user, authenticated by its bearer token.
    #[instrument(skip(self, bearer, body))]
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        bearer: &str,
        body: Option<&Value>,
    ) -> Result<UpstreamReply, AuthError> {
        let url = self.endpoint_url(path)?;
        let mut request = self.http.request(method, url).bearer_auth(bearer);
        if let Some(body) = body {
            request = request.json(body);
        }
        relay(request).await
    }
}

async fn identity_from_response(response: Response) -> Result<UpstreamIdentity, AuthError> {
    let status = response.status();
    if status != StatusCode::OK {
        warn!("upstream rejected identity: {status}");
        return Err(AuthError::Unauthorized);
    }

    let body = response.bytes().await?;
    let identity = UpstreamIdentity::from_body(&body)?;

    debug!("upstream accepted identity");

    Ok(identity)
}

async fn relay(request: RequestBuilder) -> Result<UpstreamReply, AuthError> {
    let response = request.send().await?;
    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let body = response.bytes().await?.to_vec();

    debug!("upstream replied {status}");

    Ok(UpstreamReply {
        status,
        content_type,
        body,
    })
}
