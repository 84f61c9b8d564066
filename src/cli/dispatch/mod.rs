//! Map validated CLI arguments to the action the binary executes.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{providers, session, upstream, ARG_PORT};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let upstream_opts = upstream::Options::parse(matches)?;
    let session_opts = session::Options::parse(matches, port)?;
    let provider_opts = providers::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        api_url: upstream_opts.api_url,
        api_key_token: upstream_opts.api_key_token,
        upstream_timeout: upstream_opts.timeout,
        session_secret: session_opts.session_secret,
        public_url: session_opts.public_url,
        dev: session_opts.dev,
        providers: provider_opts.providers,
        oauth_endpoints: provider_opts.oauth_endpoints,
    }))
}
