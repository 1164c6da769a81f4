//! `devices`: poll once and list the snapshot.

use crestron_core::Controller;

use crate::cli::{DevicesArgs, GlobalOpts};
use crate::error::BridgeError;
use crate::output;

pub async fn handle(args: DevicesArgs, global: &GlobalOpts) -> Result<(), BridgeError> {
    let controller = Controller::new(crate::config::bridge_config(global, None)?)?;
    super::poll_once(&controller).await?;

    let devices: Vec<_> = controller
        .snapshot()
        .devices()
        .into_iter()
        .filter(|d| args.all || d.is_visible())
        .filter(|d| args.subtype.is_none_or(|t| d.subtype == t))
        .collect();

    let rendered =
        output::render_devices(global.output, &devices, output::should_color(global.color))?;
    output::print_lines(&[rendered]);
    Ok(())
}
