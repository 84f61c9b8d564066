use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use url::Url;

use crate::gateway::provider::{ProviderEndpoints, ProviderKind};

pub const ARG_OAUTH_AUTHORIZE_URL: &str = "oauth-authorize-url";
pub const ARG_OAUTH_TOKEN_URL: &str = "oauth-token-url";
pub const ARG_OAUTH_USERINFO_URL: &str = "oauth-userinfo-url";

/// Flag ids and environment variables of one provider's client credentials.
struct CredentialArgs {
    kind: ProviderKind,
    client_id: &'static str,
    client_id_env: &'static str,
    client_secret: &'static str,
    client_secret_env: &'static str,
}

const CREDENTIAL_ARGS: [CredentialArgs; 5] = [
    CredentialArgs {
        kind: ProviderKind::Google,
        client_id: "google-client-id",
        client_id_env: "PASSGATE_GOOGLE_CLIENT_ID",
        client_secret: "google-client-secret",
        client_secret_env: "PASSGATE_GOOGLE_CLIENT_SECRET",
    },
    CredentialArgs {
        kind: ProviderKind::Facebook,
        client_id: "facebook-client-id",
        client_id_env: "PASSGATE_FACEBOOK_CLIENT_ID",
        client_secret: "facebook-client-secret",
        client_secret_env: "PASSGATE_FACEBOOK_CLIENT_SECRET",
    },
    CredentialArgs {
        kind: ProviderKind::LinkedIn,
        client_id: "linkedin-client-id",
        client_id_env: "PASSGATE_LINKEDIN_CLIENT_ID",
        client_secret: "linkedin-client-secret",
        client_secret_env: "PASSGATE_LINKEDIN_CLIENT_SECRET",
    },
    CredentialArgs {
        kind: ProviderKind::Twitter,
        client_id: "twitter-client-id",
        client_id_env: "PASSGATE_TWITTER_CLIENT_ID",
        client_secret: "twitter-client-secret",
        client_secret_env: "PASSGATE_TWITTER_CLIENT_SECRET",
    },
    CredentialArgs {
        kind: ProviderKind::OAuth2,
        client_id: "google-oauth-client-id",
        client_id_env: "PASSGATE_GOOGLE_OAUTH_CLIENT_ID",
        client_secret: "google-oauth-client-secret",
        client_secret_env: "PASSGATE_GOOGLE_OAUTH_CLIENT_SECRET",
    },
];

#[derive(Clone)]
pub struct ProviderCredentials {
    pub kind: ProviderKind,
    pub client_id: String,
    pub client_secret: SecretString,
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("kind", &self.kind)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Options {
    /// Providers with both a client id and a client secret.
    pub providers: Vec<ProviderCredentials>,
    /// Endpoints of the generic OAuth2 provider.
    pub oauth_endpoints: ProviderEndpoints,
}

impl Options {
    /// Parse provider credentials; half-configured providers are skipped.
    ///
    /// # Errors
    /// Returns an error if a generic OAuth2 endpoint is not a valid URL.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let providers = CREDENTIAL_ARGS
            .iter()
            .filter_map(|args| {
                let client_id = get_non_empty(args.client_id)?;
                let client_secret = get_non_empty(args.client_secret)?;
                Some(ProviderCredentials {
                    kind: args.kind,
                    client_id,
                    client_secret: SecretString::from(client_secret),
                })
            })
            .collect();

        let mut oauth_endpoints = ProviderEndpoints::for_kind(ProviderKind::OAuth2)?;
        let parse_url = |id: &str| -> anyhow::Result<Option<Url>> {
            get_non_empty(id)
                .map(|value| Url::parse(&value).map_err(|e| anyhow::anyhow!("invalid --{id}: {e}")))
                .transpose()
        };
        if let Some(url) = parse_url(ARG_OAUTH_AUTHORIZE_URL)? {
            oauth_endpoints.authorize_url = url;
        }
        if let Some(url) = parse_url(ARG_OAUTH_TOKEN_URL)? {
            oauth_endpoints.token_url = url;
        }
        if let Some(url) = parse_url(ARG_OAUTH_USERINFO_URL)? {
            oauth_endpoints.userinfo_url = url;
        }

        Ok(Self {
            providers,
            oauth_endpoints,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = CREDENTIAL_ARGS.iter().fold(command, |command, args| {
        command
            .arg(
                Arg::new(args.client_id)
                    .long(args.client_id)
                    .help(format!("OAuth client id for {}", args.kind))
                    .env(args.client_id_env),
            )
            .arg(
                Arg::new(args.client_secret)
                    .long(args.client_secret)
                    .help(format!("OAuth client secret for {}", args.kind))
                    .env(args.client_secret_env),
            )
    });

    command
        .arg(
            Arg::new(ARG_OAUTH_AUTHORIZE_URL)
                .long(ARG_OAUTH_AUTHORIZE_URL)
                .help("Authorization endpoint of the generic OAuth2 provider")
                .env("PASSGATE_OAUTH_AUTHORIZE_URL"),
        )
        .arg(
            Arg::new(ARG_OAUTH_TOKEN_URL)
                .long(ARG_OAUTH_TOKEN_URL)
                .help("Token endpoint of the generic OAuth2 provider")
                .env("PASSGATE_OAUTH_TOKEN_URL"),
        )
        .arg(
            Arg::new(ARG_OAUTH_USERINFO_URL)
                .long(ARG_OAUTH_USERINFO_URL)
                .help("User-info endpoint of the generic OAuth2 provider")
                .env("PASSGATE_OAUTH_USERINFO_URL"),
        )
}
