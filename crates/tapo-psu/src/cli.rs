//! Clap derive structures for the `tapo-psu` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// tapo-psu -- switch a power supply through a Tapo smart plug
#[derive(Debug, Parser)]
#[command(
    name = "tapo-psu",
    version,
    about = "Switch a PSU through a Tapo P110 smart plug",
    long_about = "Controls a single Tapo smart plug used as a power-supply switch.\n\n\
        Settings come from the config file, TAPO_PSU_* environment variables\n\
        and the flags below, in increasing order of precedence.",
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
    /// IP address or hostname of the plug
    #[arg(long, short = 'a', env = "TAPO_PSU_ADDRESS", global = true)]
    pub address: Option<String>,

    /// Tapo account e-mail
    #[arg(long, short = 'u', env = "TAPO_PSU_USERNAME", global = true)]
    pub username: Option<String>,

    /// Tapo account password
    #[arg(
        long,
        env = "TAPO_PSU_PASSWORD",
        global = true,
        hide = true,
        hide_env_values = true
    )]
    pub password: Option<String>,

    /// Device call timeout in seconds
    #[arg(long, env = "TAPO_PSU_TIMEOUT_SECS", global = true)]
    pub timeout: Option<u64>,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, env = "TAPO_PSU_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable (default)
    Table,
    /// Pretty-printed JSON
    Json,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and report model, firmware and power state
    Check,

    /// Switch the PSU on
    On,

    /// Switch the PSU off
    Off,

    /// Print whether the PSU is on
    State(StateArgs),

    /// Manage the settings file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct StateArgs {
    /// Keep polling every N seconds until interrupted
    #[arg(long, short = 'w', value_name = "SECS")]
    pub watch: Option<u64>,

    /// Stop watching after this many polls
    #[arg(long, requires = "watch")]
    pub count: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the resolved settings (password masked)
    Show,

    /// Write a settings file from defaults and the given flags
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the settings file path
    Path,

    /// Store the password in the system keyring
    SetPassword,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
