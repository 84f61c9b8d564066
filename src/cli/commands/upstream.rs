use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use std::time::Duration;
use url::Url;

pub const ARG_API_URL: &str = "api-url";
pub const ARG_API_KEY_TOKEN: &str = "api-key-token";
pub const ARG_UPSTREAM_TIMEOUT_SECONDS: &str = "upstream-timeout-seconds";

#[derive(Clone)]
pub struct Options {
    pub api_url: Url,
    pub api_key_token: SecretString,
    pub timeout: Duration,
}

impl Options {
    /// Parse upstream arguments from matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing or the URL is invalid.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let api_url = match matches.get_one::<String>(ARG_API_URL) {
            Some(value) if !value.trim().is_empty() => Url::parse(value.trim())
                .map_err(|e| anyhow::anyhow!("invalid --{ARG_API_URL}: {e}"))?,
            _ => anyhow::bail!("missing required argument: --{ARG_API_URL}"),
        };

        let api_key_token = match matches.get_one::<String>(ARG_API_KEY_TOKEN) {
            Some(value) if !value.trim().is_empty() => SecretString::from(value.clone()),
            _ => anyhow::bail!("missing required argument: --{ARG_API_KEY_TOKEN}"),
        };

        let timeout = matches
            .get_one::<u64>(ARG_UPSTREAM_TIMEOUT_SECONDS)
            .copied()
            .unwrap_or(10);

        Ok(Self {
            api_url,
            api_key_token,
            timeout: Duration::from_secs(timeout),
        })
    }
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("api_url", &self.api_url.as_str())
            .field("api_key_token", &"***")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("Base URL of the upstream user API")
                .env("PASSGATE_API_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_API_KEY_TOKEN)
                .long(ARG_API_KEY_TOKEN)
                .help("API key sent to the upstream user API as `apiKeyToken`")
                .env("PASSGATE_API_KEY_TOKEN")
                .required(true),
        )
        .arg(
            Arg::new(ARG_UPSTREAM_TIMEOUT_SECONDS)
                .long(ARG_UPSTREAM_TIMEOUT_SECONDS)
                .help("Timeout for upstream and provider calls in seconds")
                .env("PASSGATE_UPSTREAM_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
