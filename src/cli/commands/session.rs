use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;
use url::Url;

pub const ARG_SESSION_SECRET: &str = "session-secret";
pub const ARG_PUBLIC_URL: &str = "public-url";
pub const ARG_DEV: &str = "dev";

#[derive(Clone)]
pub struct Options {
    pub session_secret: SecretString,
    pub public_url: Url,
    pub dev: bool,
}

impl Options {
    /// Parse session arguments; `public-url` defaults to `http://localhost:<port>`.
    ///
    /// # Errors
    /// Returns an error if the session secret is missing or the public URL is invalid.
    pub fn parse(matches: &ArgMatches, port: u16) -> anyhow::Result<Self> {
        let session_secret = match matches.get_one::<String>(ARG_SESSION_SECRET) {
            Some(value) if !value.trim().is_empty() => SecretString::from(value.clone()),
            _ => anyhow::bail!("missing required argument: --{ARG_SESSION_SECRET}"),
        };

        let public_url = matches
            .get_one::<String>(ARG_PUBLIC_URL)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| format!("http://localhost:{port}"));
        let public_url = Url::parse(&public_url)
            .map_err(|e| anyhow::anyhow!("invalid --{ARG_PUBLIC_URL}: {e}"))?;

        Ok(Self {
            session_secret,
            public_url,
            dev: matches.get_flag(ARG_DEV),
        })
    }
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("session_secret", &"***")
            .field("public_url", &self.public_url.as_str())
            .field("dev", &self.dev)
            .finish()
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_SECRET)
                .long(ARG_SESSION_SECRET)
                .help("Secret used to sign the OAuth flow cookie")
                .env("PASSGATE_SESSION_SECRET")
                .required(true),
        )
        .arg(
            Arg::new(ARG_PUBLIC_URL)
                .long(ARG_PUBLIC_URL)
                .help("Externally visible base URL, used for OAuth redirect URIs and CORS")
                .env("PASSGATE_PUBLIC_URL"),
        )
        .arg(
            Arg::new(ARG_DEV)
                .long(ARG_DEV)
                .help("Development mode: session cookies drop HttpOnly and Secure")
                .env("PASSGATE_DEV")
                .action(ArgAction::SetTrue),
        )
}
