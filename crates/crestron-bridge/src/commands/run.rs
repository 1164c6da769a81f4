//! `run`: poll continuously and print change reports.

use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use crestron_core::Controller;

use crate::cli::{GlobalOpts, RunArgs};
use crate::error::BridgeError;
use crate::output;

pub async fn handle(args: RunArgs, global: &GlobalOpts) -> Result<(), BridgeError> {
    let config = crate::config::bridge_config(global, args.interval)?;
    let interval = config.poll_interval;
    let controller = Controller::new(config)?;
    let color = output::should_color(global.color);

    // Subscribe first so the initial poll's report is printed too.
    let mut reports = controller.subscribe();
    let mut status = controller.status();
    controller.start().await?;
    info!(
        devices = controller.snapshot().len(),
        interval = %humantime::format_duration(interval),
        "polling, press Ctrl-C to stop"
    );

    let mut needs_attention = false;
    loop {
        tokio::select! {
            biased;
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("interrupted, shutting down");
                break;
            }
            report = reports.recv() => match report {
                Ok(report) => {
                    let lines = output::render_report(&report, &controller.snapshot(), color);
                    output::print_lines(&lines);
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "report stream lagged"),
                Err(RecvError::Closed) => break,
            },
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                if current.needs_attention && !needs_attention {
                    error!(
                        error = current.last_error.as_deref().unwrap_or_default(),
                        "token rejected, a new API token is required"
                    );
                }
                needs_attention = current.needs_attention;
            }
        }
    }

    controller.shutdown().await;
    Ok(())
}
