//! CLI command dispatch and handlers.

pub mod replay;
pub mod validate;

use crate::cli::args::{Cli, Commands};
use crate::error::VigilError;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli) -> Result<(), VigilError> {
    match cli.command {
        Commands::Validate(args) => validate::run(&args),
        Commands::Replay(args) => replay::run(&args).await,
    }
}
