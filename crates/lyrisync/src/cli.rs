//! Clap derive structures for the `lyrisync` binary.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// lyrisync -- live lyrics from OpenLP to vMix titles
#[derive(Debug, Parser)]
#[command(
    name = "lyrisync",
    version,
    about = "Keep vMix lyric titles in sync with a live OpenLP presentation",
    long_about = "Listens to OpenLP's live slide feed, formats each slide and pushes it \
        to a vMix title input, managing overlay visibility and recording.\n\n\
        A local HTTP control API accepts the same actions from keypads and \
        companion software. Running without a subcommand is the same as `lyrisync run`.",
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Option<Command>,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, short = 'c', env = "LYRISYNC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Write logs to this file instead of stderr
    #[arg(long, env = "LYRISYNC_LOG", global = true)]
    pub log_file: Option<PathBuf>,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the sync engine and control API (default)
    Run(RunArgs),

    /// Inspect or create the settings file
    #[command(alias = "cfg")]
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// Control API bind address (overrides control_api_bind)
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Control API port (overrides control_api_port)
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Do not connect to OpenLP; only the control API drives the titles
    #[arg(long)]
    pub no_presentation: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the resolved settings (file + environment)
    Show,

    /// Print the settings file path
    Path,

    /// Validate the resolved settings
    Check,

    /// Write a settings file with every default spelled out
    Init {
        /// Overwrite an existing file
        #[arg(long, short = 'f')]
        force: bool,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
