//! Output formatting: table or JSON.

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use crestron_core::{
    ChangeRecord, CompositeId, Device, HiddenReason, PollOutcome, PollReport, Snapshot, Visibility,
};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::BridgeError;

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

// ── Device table ─────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    subtype: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl DeviceRow {
    fn new(d: &Device, color: bool) -> Self {
        let status = if !d.is_available() {
            paint("offline", color, |s| s.red().to_string())
        } else if let Some(reason) = hidden_reason(d) {
            paint(reason, color, |s| s.dimmed().to_string())
        } else {
            paint("ok", color, |s| s.green().to_string())
        };
        Self {
            id: d.id.to_string(),
            name: d.full_name.clone(),
            subtype: d.subtype.to_string(),
            state: d.state_summary(),
            status,
        }
    }
}

fn hidden_reason(d: &Device) -> Option<&'static str> {
    match d.visibility {
        Visibility::Visible => None,
        Visibility::Hidden(HiddenReason::NameFilter) => Some("hidden (name)"),
        Visibility::Hidden(HiddenReason::CategoryDisabled) => Some("hidden (category)"),
    }
}

fn paint(text: &str, color: bool, style: impl Fn(&str) -> String) -> String {
    if color { style(text) } else { text.to_owned() }
}

pub fn render_devices(
    format: OutputFormat,
    devices: &[Arc<Device>],
    color: bool,
) -> Result<String, BridgeError> {
    match format {
        OutputFormat::Table => {
            let rows: Vec<DeviceRow> = devices.iter().map(|d| DeviceRow::new(d, color)).collect();
            Ok(Table::new(rows).with(Style::rounded()).to_string())
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(devices)?),
    }
}

// ── Poll reports ─────────────────────────────────────────────────────

/// One line per changed device, prefixed by the poll outcome.
pub fn render_report(report: &PollReport, snapshot: &Snapshot, color: bool) -> Vec<String> {
    let time = report.finished_at.format("%H:%M:%S").to_string();
    let mut lines = Vec::new();

    if report.outcome == PollOutcome::Failed {
        let failures: Vec<String> = report.failures.iter().map(ToString::to_string).collect();
        let text = format!("{time} poll failed: {}", failures.join("; "));
        lines.push(paint(&text, color, |s| s.red().to_string()));
        return lines;
    }

    lines.extend(change_lines(&report.changes, snapshot, &time, color));
    if report.outcome == PollOutcome::Partial {
        for failure in &report.failures {
            let text = format!("{time} partial: {failure}");
            lines.push(paint(&text, color, |s| s.yellow().to_string()));
        }
    }
    lines
}

fn change_lines(changes: &ChangeRecord, snapshot: &Snapshot, time: &str, color: bool) -> Vec<String> {
    let name = |id: &CompositeId| {
        snapshot
            .get(id)
            .map_or_else(|| id.to_string(), |d| d.full_name.clone())
    };
    let summary = |id: &CompositeId| snapshot.get(id).map(|d| d.state_summary()).unwrap_or_default();

    let mut lines = Vec::with_capacity(changes.len());
    for id in &changes.added {
        let text = format!("{time} + {id} {} [{}]", name(id), summary(id));
        lines.push(paint(&text, color, |s| s.green().to_string()));
    }
    for id in &changes.removed {
        let text = format!("{time} - {id}");
        lines.push(paint(&text, color, |s| s.red().to_string()));
    }
    for (id, fields) in &changes.changed {
        lines.push(format!(
            "{time} ~ {id} {} [{}] ({})",
            name(id),
            summary(id),
            fields.join(", ")
        ));
    }
    lines
}

/// Print lines to stdout, ignoring broken pipes.
pub fn print_lines(lines: &[String]) {
    let mut stdout = io::stdout().lock();
    for line in lines {
        let _ = writeln!(stdout, "{line}");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn changes_without_snapshot_entries_fall_back_to_ids() {
        let mut changed = BTreeMap::new();
        changed.insert(CompositeId::device(5), vec!["level"]);
        let report = PollReport {
            outcome: PollOutcome::Fresh,
            changes: ChangeRecord {
                added: Vec::new(),
                removed: vec![CompositeId::sensor(2)],
                changed,
            },
            failures: Vec::new(),
            device_count: 1,
            finished_at: Utc::now(),
        };
        let lines = render_report(&report, &Snapshot::empty(), false);

        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("- sensor:2"));
        assert!(lines[1].ends_with("~ device:5 device:5 [] (level)"));
    }

    #[test]
    fn empty_device_list_renders_as_json_array() {
        let json = render_devices(OutputFormat::Json, &[], false).unwrap();
        assert_eq!(json, "[]");
    }
}
