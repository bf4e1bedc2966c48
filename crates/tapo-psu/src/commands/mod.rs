//! Command dispatch: bridges CLI args to the session layer and output.

pub mod check;
pub mod config_cmd;
pub mod power;
pub mod state;

use tapo_psu_core::SessionConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a device-bound command to its handler.
pub async fn dispatch(
    cmd: Command,
    config: SessionConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Check => check::handle(&config, global).await,
        Command::On => power::handle(config, true, global).await,
        Command::Off => power::handle(config, false, global).await,
        Command::State(args) => state::handle(config, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
