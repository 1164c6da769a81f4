//! Clap derive structures for the `crestron-bridge` CLI.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crestron_core::{CompositeId, Subtype};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// crestron-bridge -- keep a live view of a Crestron Home processor
#[derive(Debug, Parser)]
#[command(
    name = "crestron-bridge",
    version,
    about = "Poll and control a Crestron Home processor over its CWS REST API",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "CRESTRON_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Processor host or URL (overrides the config file)
    #[arg(long, short = 'H', global = true)]
    pub host: Option<String>,

    /// Accept self-signed TLS certificates even if the config asks for
    /// verification
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll continuously and print changes until interrupted
    Run(RunArgs),

    /// Poll once and list devices
    #[command(alias = "ls")]
    Devices(DevicesArgs),

    /// Send a command to one device
    Send(SendArgs),

    /// Inspect or create the config file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Poll interval, e.g. `15s` or `1m` (minimum 10s)
    #[arg(long, short = 'i', value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,
}

#[derive(Debug, Args)]
pub struct DevicesArgs {
    /// Only list devices of this subtype (e.g. `Dimmer`, `DoorSensor`)
    #[arg(long = "type", short = 't')]
    pub subtype: Option<Subtype>,

    /// Include hidden devices
    #[arg(long, short = 'a')]
    pub all: bool,
}

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Device id, e.g. `device:12` or `thermostat:3`
    pub id: CompositeId,

    /// Command name, e.g. `turn_on`, `set_position`, `set_setpoint`
    pub command: String,

    /// Command value, e.g. `70` or `22.5`
    pub value: Option<String>,

    /// Dimmer fade time, e.g. `2s` (light commands only)
    #[arg(long, short = 't', value_parser = humantime::parse_duration)]
    pub transition: Option<Duration>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration (token redacted)
    Show,

    /// Print the config file path
    Path,

    /// Write a new config file
    Init {
        /// Processor host or URL
        #[arg(long)]
        host: String,

        /// Environment variable that will hold the API token
        #[arg(long, default_value = "CRESTRON_TOKEN")]
        token_env: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
