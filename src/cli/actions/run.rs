use crate::cli::actions::{server, Action};
use anyhow::Result;

// Single dispatch point for all CLI actions.

/// Execute the provided action.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Server(args) => server::execute(args).await,
    }
}
