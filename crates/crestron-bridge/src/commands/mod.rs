//! Subcommand handlers.

pub mod config_cmd;
pub mod devices;
pub mod run;
pub mod send;

use crestron_core::{Controller, PollOutcome};

use crate::cli::{Command, GlobalOpts};
use crate::error::BridgeError;

pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), BridgeError> {
    match cmd {
        Command::Run(args) => run::handle(args, global).await,
        Command::Devices(args) => devices::handle(args, global).await,
        Command::Send(args) => send::handle(args, global).await,
        Command::Config(args) => config_cmd::handle(args, global),
        Command::Completions(_) => Ok(()),
    }
}

/// Poll once, failing if nothing could be fetched.
async fn poll_once(controller: &Controller) -> Result<(), BridgeError> {
    let Some(report) = controller.refresh().await else {
        return Ok(());
    };
    if report.outcome == PollOutcome::Failed {
        if let Some(failure) = report.failures.first() {
            return Err(failure.error.clone().into());
        }
    }
    for failure in &report.failures {
        tracing::warn!(%failure, "partial poll");
    }
    Ok(())
}
