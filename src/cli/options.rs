use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Start and supervise a backend/frontend development server pair
#[derive(Parser)]
#[command(name = "devpair")]
#[command(version)]
#[command(about = "Start and supervise a backend/frontend development server pair")]
#[command(after_help = "Examples:\n  \
    devpair up\n  \
    devpair up --backend-port 8000 --yes\n  \
    devpair up -c devpair.yaml\n  \
    devpair check")]
#[command(arg_required_else_help = true)]
pub struct Options {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start both servers and supervise them until interrupted
    #[command(after_help = "Examples:\n  \
        devpair up\n  \
        devpair up --backend-dir api --frontend-dir web")]
    Up(UpArgs),

    /// Run the preflight checks without starting anything
    Check(CheckArgs),
}

/// Arguments for the up command
#[derive(Args, Default)]
pub struct UpArgs {
    /// Answer yes to the missing-dependencies prompt
    #[arg(long, short = 'y')]
    pub yes: bool,

    #[command(flatten)]
    pub common: CommonOptions,
}

/// Arguments for the check command
#[derive(Args, Default)]
pub struct CheckArgs {
    #[command(flatten)]
    pub common: CommonOptions,
}

/// Common options shared across subcommands
#[derive(Args, Clone, Default)]
pub struct CommonOptions {
    /// Backend working directory (overrides the config file)
    #[arg(long, value_name = "PATH")]
    pub backend_dir: Option<PathBuf>,

    /// Frontend working directory (overrides the config file)
    #[arg(long, value_name = "PATH")]
    pub frontend_dir: Option<PathBuf>,

    /// Backend port; also fixes the API base URL handed to the frontend
    #[arg(long, value_name = "PORT")]
    pub backend_port: Option<u16>,

    /// Runtime configuration file (YAML).
    /// Contains service commands, ports, settle delays, the shutdown grace
    /// period, and output noise markers. All fields are optional.
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable verbose output (DEBUG level logging)
    #[arg(long, short = 'v')]
    pub verbose: bool,
}
