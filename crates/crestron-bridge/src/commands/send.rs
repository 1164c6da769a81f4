//! `send`: issue one command and wait for it to reach the processor.

use std::time::Duration;

use tracing::info;

use crestron_core::{Command, Controller, CoreError};

use crate::cli::{GlobalOpts, SendArgs};
use crate::error::BridgeError;

pub async fn handle(args: SendArgs, global: &GlobalOpts) -> Result<(), BridgeError> {
    let mut command = Command::parse(&args.command, args.value.as_deref())?;
    if let Some(fade) = args.transition {
        command = command.with_transition(whole_seconds(fade)?)?;
    }

    let controller = Controller::new(crate::config::bridge_config(global, None)?)?;
    super::poll_once(&controller).await?;

    controller.send_command(&args.id, command).await?;
    controller.flush_commands().await?;

    let device = controller.get(&args.id)?;
    info!(id = %args.id, name = %device.full_name, "command sent");
    println!("{} {}: {}", args.id, device.full_name, device.state_summary());
    Ok(())
}

fn whole_seconds(fade: Duration) -> Result<u32, CoreError> {
    u32::try_from(fade.as_secs()).map_err(|_| CoreError::InvalidValue {
        message: format!("transition of {}s is too long", fade.as_secs()),
    })
}
