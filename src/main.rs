use clap::Parser;
use devpair::{
    cli::options::{Command, Options},
    commands,
};

fn main() -> eyre::Result<()> {
    let opts = Options::parse();
    init_tracing(&opts);

    match &opts.command {
        Command::Up(args) => commands::up::handle_up(args),
        Command::Check(args) => commands::check::handle_check(args),
    }
}

/// Initialize the tracing subscriber. RUST_LOG takes precedence; otherwise
/// --verbose selects DEBUG and the default is INFO.
fn init_tracing(opts: &Options) {
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt::init();
        return;
    }

    let verbose = match &opts.command {
        Command::Up(args) => args.common.verbose,
        Command::Check(args) => args.common.verbose,
    };
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();
}
