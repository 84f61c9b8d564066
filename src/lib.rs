//! # Passgate (authentication gateway)
//!
//! `passgate` sits in front of an upstream user API. It never stores passwords or
//! sessions itself: sign-in requests are verified by the upstream service, third-party
//! logins (Google, Facebook, LinkedIn, Twitter and a generic OAuth2 provider) are
//! normalized into one identity shape and exchanged upstream, and the resulting bearer
//! token is handed to the browser as the `token` cookie.
//!
//! ## Layout
//!
//! - [`gateway`]: the identity-broker core. Credential verifier, provider adapters,
//!   broker and session issuer. Returns typed [`gateway::AuthError`]s.
//! - [`api`]: axum routes that map those errors to HTTP and set cookies.
//! - [`cli`]: flags, telemetry and the server action.

pub mod api;
pub mod cli;
pub mod gateway;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
