//! The `check` command: run the preflight checks and report, without
//! starting anything or prompting.

use crate::{cli::config::load_runtime_config, cli::options::CheckArgs, preflight};
use eyre::eyre;
use tracing::{info, warn};

pub fn handle_check(args: &CheckArgs) -> eyre::Result<()> {
    let config = load_runtime_config(&args.common)?;
    let targets = preflight::targets(&config);

    preflight::check_structure(&targets)?;
    preflight::check_tools()?;
    info!("node and npm found");

    let missing = preflight::missing_dependencies(&targets);
    if missing.is_empty() {
        info!("Dependencies verified");
        info!("All preflight checks passed");
        Ok(())
    } else {
        for target in &missing {
            warn!(
                "{}: node_modules missing, run `cd {} && npm install`",
                target.name,
                target.dir.display()
            );
        }
        let names: Vec<_> = missing.iter().map(|t| t.name.label()).collect();
        Err(eyre!("missing dependencies in: {}", names.join(", ")))
    }
}
