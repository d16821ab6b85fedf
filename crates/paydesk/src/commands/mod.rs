//! Command dispatch: bridges CLI args -> dashboard calls -> output formatting.

pub mod config_cmd;
pub mod countries;
pub mod devices;
pub mod networks;
pub mod numbers;
pub mod transactions;
pub mod util;

use paydesk_core::Dashboard;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    dashboard: &Dashboard,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Countries(args) => countries::handle(dashboard, args, global).await,
        Command::Networks(args) => networks::handle(dashboard, args, global).await,
        Command::Numbers(args) => numbers::handle(dashboard, args, global).await,
        Command::Devices(args) => devices::handle(dashboard, args, global).await,
        Command::Transactions(args) => transactions::handle(dashboard, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
