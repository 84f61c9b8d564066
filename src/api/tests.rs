use super::*;
use crate::gateway::{
    flow::{FlowSigner, FlowState},
    provider::{tests::adapter_for, ProviderKind, ProviderRegistry},
    upstream::{UpstreamClient, SIGN_IN_PATH, SIGN_PROVIDER_PATH, SIGN_UP_PATH},
    IdentityBroker,
};
use axum::{
    body::to_bytes,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_METHOD, COOKIE, LOCATION, ORIGIN,
            SET_COOKIE,
        },
        StatusCode,
    },
    response::Response,
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const SESSION_SECRET: &str = "session-secret";

fn gateway_state(server: &MockServer, kinds: &[ProviderKind], dev: bool) -> anyhow::Result<Arc<GatewayState>> {
    let upstream = UpstreamClient::new(Url::parse(&server.uri())?, Duration::from_secs(5))?;
    let adapters = kinds
        .iter()
        .map(|kind| adapter_for(*kind, server))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let broker = IdentityBroker::new(
        upstream,
        ProviderRegistry::new(adapters),
        SecretString::from("api-key".to_string()),
    );
    Ok(Arc::new(GatewayState::new(
        broker,
        FlowSigner::new(SecretString::from(SESSION_SECRET.to_string())),
        Url::parse("https://gate.example.com")?,
        dev,
    )))
}

async fn send(state: Arc<GatewayState>, request: Request<Body>) -> anyhow::Result<Response> {
    Ok(router(state)?.oneshot(request).await?)
}

async fn json_body(response: Response) -> anyhow::Result<Value> {
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&body)?)
}

fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn health_sets_request_id_and_security_headers() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let response = send(
        gateway_state(&server, &[], false)?,
        Request::builder().uri("/health").body(Body::empty())?,
    )
    .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert!(headers.get(REQUEST_ID).is_some());
    assert_eq!(headers.get(X_CONTENT_TYPE_OPTIONS), Some(&HeaderValue::from_static("nosniff")));
    assert_eq!(headers.get(X_FRAME_OPTIONS), Some(&HeaderValue::from_static("DENY")));
    assert_eq!(headers.get(REFERRER_POLICY), Some(&HeaderValue::from_static("no-referrer")));
    Ok(())
}

#[tokio::test]
async fn request_id_is_propagated() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let response = send(
        gateway_state(&server, &[], false)?,
        Request::builder()
            .uri("/health")
            .header(REQUEST_ID, "01J0000000000000000000TEST")
            .body(Body::empty())?,
    )
    .await?;
    assert_eq!(
        response.headers().get(REQUEST_ID),
        Some(&HeaderValue::from_static("01J0000000000000000000TEST"))
    );
    Ok(())
}

#[tokio::test]
async fn sign_in_without_credentials_is_unauthorized() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let response = send(
        gateway_state(&server, &[], false)?,
        Request::builder()
            .method("POST")
            .uri("/auth/sign-in")
            .body(Body::empty())?,
    )
    .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await?["error"], "unauthorized");
    Ok(())
}

#[tokio::test]
async fn sign_in_in_development_drops_cookie_flags() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SIGN_IN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "abc", "id": 1})))
        .mount(&server)
        .await;

    let response = send(
        gateway_state(&server, &[], true)?,
        Request::builder()
            .method("POST")
            .uri("/auth/sign-in")
            // bob:secret
            .header(AUTHORIZATION, "Basic Ym9iOnNlY3JldA==")
            .body(Body::empty())?,
    )
    .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        set_cookies(&response),
        vec!["token=abc; Path=/; SameSite=Lax; Max-Age=7200".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn sign_in_refuses_token_that_cannot_become_a_cookie() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SIGN_IN_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"token": "jwt.\u{fc}.sig", "id": 1})),
        )
        .mount(&server)
        .await;

    let response = send(
        gateway_state(&server, &[], false)?,
        Request::builder()
            .method("POST")
            .uri("/auth/sign-in")
            .header(AUTHORIZATION, "Basic Ym9iOnNlY3JldA==")
            .body(Body::empty())?,
    )
    .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).is_empty());
    Ok(())
}

#[tokio::test]
async fn preflight_carries_security_headers() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let response = send(
        gateway_state(&server, &[], false)?,
        Request::builder()
            .method("OPTIONS")
            .uri("/auth/sign-in")
            .header(ORIGIN, "https://gate.example.com")
            .header(ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())?,
    )
    .await?;

    assert!(response.status().is_success());
    let headers = response.headers();
    assert_eq!(
        headers.get(ACCESS_CONTROL_ALLOW_ORIGIN),
        Some(&HeaderValue::from_static("https://gate.example.com"))
    );
    assert_eq!(headers.get(X_CONTENT_TYPE_OPTIONS), Some(&HeaderValue::from_static("nosniff")));
    assert_eq!(headers.get(X_FRAME_OPTIONS), Some(&HeaderValue::from_static("DENY")));
    assert_eq!(headers.get(REFERRER_POLICY), Some(&HeaderValue::from_static("no-referrer")));
    Ok(())
}

#[tokio::test]
async fn sign_in_reports_unreachable_upstream_as_bad_gateway() -> anyhow::Result<()> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);

    let server = MockServer::start().await;
    let mut gateway = (*gateway_state(&server, &[], false)?).clone();
    gateway.broker = IdentityBroker::new(
        UpstreamClient::new(Url::parse(&format!("http://127.0.0.1:{port}"))?, Duration::from_secs(5))?,
        ProviderRegistry::default(),
        SecretString::from("api-key".to_string()),
    );

    let response = send(
        Arc::new(gateway),
        Request::builder()
            .method("POST")
            .uri("/auth/sign-in")
            .header(AUTHORIZATION, "Basic Ym9iOnNlY3JldA==")
            .body(Body::empty())?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    Ok(())
}

#[tokio::test]
async fn sign_up_returns_created() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SIGN_UP_PATH))
        .and(body_json(json!({
            "email": "bob@example.com",
            "name": "Bob",
            "apiKeyToken": "api-key",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 9})))
        .expect(1)
        .mount(&server)
        .await;

    let response = send(
        gateway_state(&server, &[], false)?,
        Request::builder()
            .method("POST")
            .uri("/auth/sign-up")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"email": "Bob@Example.com", "name": "Bob"}).to_string()))?,
    )
    .await?;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await?, json!({"message": "user created"}));
    Ok(())
}

#[tokio::test]
async fn sign_up_rejects_invalid_email_locally() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let response = send(
        gateway_state(&server, &[], false)?,
        Request::builder()
            .method("POST")
            .uri("/auth/sign-up")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"email": "nope"}).to_string()))?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await?,
        json!({"error": "invalid_request", "message": "Invalid email"})
    );
    Ok(())
}

#[tokio::test]
async fn sign_up_propagates_upstream_error() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SIGN_UP_PATH))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({"message": "exists"})))
        .mount(&server)
        .await;

    let response = send(
        gateway_state(&server, &[], false)?,
        Request::builder()
            .method("POST")
            .uri("/auth/sign-up")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"email": "bob@example.com"}).to_string()))?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await?, json!({"message": "exists"}));
    Ok(())
}

#[tokio::test]
async fn sign_out_clears_token_cookie() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let response = send(
        gateway_state(&server, &[], false)?,
        Request::builder()
            .method("POST")
            .uri("/auth/sign-out")
            .body(Body::empty())?,
    )
    .await?;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        set_cookies(&response),
        vec!["token=; Path=/; SameSite=Lax; Max-Age=0; HttpOnly; Secure".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn unknown_provider_is_unauthorized() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let response = send(
        gateway_state(&server, &[ProviderKind::Google], false)?,
        Request::builder().uri("/auth/myspace").body(Body::empty())?,
    )
    .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await?["error"], "unknown_provider");
    Ok(())
}

#[tokio::test]
async fn authorize_redirects_with_flow_cookie() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let response = send(
        gateway_state(&server, &[ProviderKind::Twitter], false)?,
        Request::builder()
            .uri("/auth/twitter?rememberMe=true")
            .body(Body::empty())?,
    )
    .await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(Url::parse)
        .transpose()?;
    assert!(location.is_some_and(|url| url.path() == "/authorize"
        && url.query_pairs().any(|(key, _)| key == "code_challenge")));

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 1);
    let sealed = cookies[0]
        .strip_prefix("oauth_flow=")
        .and_then(|rest| rest.split(';').next())
        .unwrap_or_default();
    let flow = FlowSigner::new(SecretString::from(SESSION_SECRET.to_string())).open(sealed)?;
    assert_eq!(flow.provider, "twitter");
    assert!(flow.remember_me);
    assert!(flow.pkce_verifier.is_some());
    Ok(())
}

#[tokio::test]
async fn callback_without_flow_cookie_is_unauthorized() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let response = send(
        gateway_state(&server, &[ProviderKind::Google], false)?,
        Request::builder()
            .uri("/auth/google/callback?code=abc&state=xyz")
            .body(Body::empty())?,
    )
    .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response)
        .iter()
        .any(|cookie| cookie.starts_with("oauth_flow=;")));
    Ok(())
}

fn sealed_flow(provider: &str, state: &str, remember_me: bool) -> anyhow::Result<String> {
    FlowSigner::new(SecretString::from(SESSION_SECRET.to_string()))
        .seal(&FlowState::new(provider, state, None, remember_me))
}

#[tokio::test]
async fn callback_with_mismatched_state_is_unauthorized() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let sealed = sealed_flow("google", "expected", false)?;
    let response = send(
        gateway_state(&server, &[ProviderKind::Google], false)?,
        Request::builder()
            .uri("/auth/google/callback?code=abc&state=forged")
            .header(COOKIE, format!("oauth_flow={sealed}"))
            .body(Body::empty())?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn callback_with_denied_consent_is_unauthorized() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let sealed = sealed_flow("google", "s1", false)?;
    let response = send(
        gateway_state(&server, &[ProviderKind::Google], false)?,
        Request::builder()
            .uri("/auth/google/callback?error=access_denied&state=s1")
            .header(COOKIE, format!("oauth_flow={sealed}"))
            .body(Body::empty())?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn callback_signs_in_through_provider() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "provider-token",
            "token_type": "bearer",
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .and(header("authorization", "Bearer provider-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "1089",
            "name": "Bob",
            "email": "bob@gmail.com",
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SIGN_PROVIDER_PATH))
        .and(body_json(json!({
            "name": "Bob",
            "email": "bob@gmail.com",
            "password": "1089",
            "apiKeyToken": "api-key",
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"token": "up", "id": 1, "name": "Bob"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let sealed = sealed_flow("google", "s1", true)?;
    let response = send(
        gateway_state(&server, &[ProviderKind::Google], false)?,
        Request::builder()
            .uri("/auth/google/callback?code=abc&state=s1")
            .header(COOKIE, format!("oauth_flow={sealed}"))
            .body(Body::empty())?,
    )
    .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert!(cookies
        .iter()
        .any(|cookie| cookie.starts_with("token=up;") && cookie.contains("Max-Age=2592000")));
    assert!(cookies.iter().any(|cookie| cookie.starts_with("oauth_flow=;")));
    assert_eq!(json_body(response).await?, json!({"id": 1, "name": "Bob"}));
    Ok(())
}

#[tokio::test]
async fn user_movies_requires_token_cookie() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let response = send(
        gateway_state(&server, &[], false)?,
        Request::builder()
            .method("POST")
            .uri("/user-movies")
            .body(Body::empty())?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn user_movies_forwards_with_bearer() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/user-movies"))
        .and(header("authorization", "Bearer abc"))
        .and(body_json(json!({"movieId": "m1"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": "um1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/user-movies/um1"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": "um1"})))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_state(&server, &[], false)?;
    let created = send(
        gateway.clone(),
        Request::builder()
            .method("POST")
            .uri("/user-movies")
            .header(COOKIE, "token=abc")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"movieId": "m1"}).to_string()))?,
    )
    .await?;
    assert_eq!(created.status(), StatusCode::CREATED);
    assert_eq!(json_body(created).await?, json!({"data": "um1"}));

    let deleted = send(
        gateway,
        Request::builder()
            .method("DELETE")
            .uri("/user-movies/um1")
            .header(COOKIE, "token=abc")
            .body(Body::empty())?,
    )
    .await?;
    assert_eq!(deleted.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn user_movies_rejects_malformed_id_with_error_body() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let response = send(
        gateway_state(&server, &[], false)?,
        Request::builder()
            .method("DELETE")
            .uri("/user-movies/um1.json")
            .header(COOKIE, "token=abc")
            .body(Body::empty())?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await?["error"], "invalid_request");
    Ok(())
}

#[test]
fn public_origin_strips_path() -> anyhow::Result<()> {
    let origin = public_origin(&Url::parse("http://localhost:8080/app/")?)?;
    assert_eq!(origin, HeaderValue::from_static("http://localhost:8080"));
    Ok(())
}
