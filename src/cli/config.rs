//! Runtime configuration
//!
//! Everything the supervisor needs at run time lives in one YAML file merged
//! under the command-line overrides. Every field has a default, so running
//! without a config file supervises `npm run dev` in ./backend and ./frontend.

use crate::{
    cli::options::CommonOptions,
    supervisor::{ServiceName, ServiceSpec, SupervisorSettings},
};
use eyre::Context;
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Default markers for build-tool chatter that is suppressed from the
/// relayed child output.
fn default_noise_markers() -> Vec<String> {
    ["webpack", "compiled successfully", "hot update"]
        .map(str::to_string)
        .to_vec()
}

fn default_command() -> Vec<String> {
    ["npm", "run", "dev"].map(str::to_string).to_vec()
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub backend: ServiceConfig,
    pub frontend: ServiceConfig,

    /// How long to wait after a graceful stop request before escalating to a
    /// forceful kill.
    pub grace_period_secs: u64,

    /// Liveness poll cadence in milliseconds.
    pub poll_interval_ms: u64,

    /// Lines containing any of these markers (case-insensitive) are not
    /// relayed.
    pub noise_markers: Vec<String>,
}

/// Resolved per-service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Working directory the start command runs in.
    pub dir: PathBuf,

    /// Start command as an argument vector.
    pub command: Vec<String>,

    /// Port the service is expected to listen on. For the backend this is
    /// also exported as PORT and baked into the frontend's API base URL.
    pub port: u16,

    /// Seconds to wait after spawning before sampling liveness once.
    pub settle_delay_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            backend: ServiceConfig {
                dir: PathBuf::from("backend"),
                command: default_command(),
                port: 9999,
                settle_delay_secs: 3,
            },
            frontend: ServiceConfig {
                dir: PathBuf::from("frontend"),
                command: default_command(),
                port: 3000,
                // The frontend toolchain recompiles its dependency graph at
                // startup and takes longer to report a crash.
                settle_delay_secs: 5,
            },
            grace_period_secs: 5,
            poll_interval_ms: 1000,
            noise_markers: default_noise_markers(),
        }
    }
}

/// On-disk shape of the config file. Every field is optional; present fields
/// overwrite the matching default, absent fields leave it alone.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RuntimeConfigFile {
    backend: ServicePatch,
    frontend: ServicePatch,
    grace_period_secs: Option<u64>,
    poll_interval_ms: Option<u64>,
    noise_markers: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ServicePatch {
    dir: Option<PathBuf>,
    command: Option<Vec<String>>,
    port: Option<u16>,
    settle_delay_secs: Option<u64>,
}

impl ServicePatch {
    fn apply(self, config: &mut ServiceConfig) {
        let Self {
            dir,
            command,
            port,
            settle_delay_secs,
        } = self;
        if let Some(dir) = dir {
            config.dir = dir;
        }
        if let Some(command) = command {
            config.command = command;
        }
        if let Some(port) = port {
            config.port = port;
        }
        if let Some(secs) = settle_delay_secs {
            config.settle_delay_secs = secs;
        }
    }
}

impl RuntimeConfigFile {
    fn apply(self, config: &mut RuntimeConfig) {
        let Self {
            backend,
            frontend,
            grace_period_secs,
            poll_interval_ms,
            noise_markers,
        } = self;
        backend.apply(&mut config.backend);
        frontend.apply(&mut config.frontend);
        if let Some(secs) = grace_period_secs {
            config.grace_period_secs = secs;
        }
        if let Some(ms) = poll_interval_ms {
            config.poll_interval_ms = ms;
        }
        if let Some(markers) = noise_markers {
            config.noise_markers = markers;
        }
    }
}

impl RuntimeConfig {
    /// Base URL under which the frontend reaches the backend API.
    pub fn api_base_url(&self) -> String {
        format!("http://localhost:{}/api/v1", self.backend.port)
    }

    /// Build the launch specs in launch order (backend strictly first: the
    /// frontend's configuration bakes in the backend's address).
    pub fn service_specs(&self) -> Vec<ServiceSpec> {
        let backend_env = vec![
            ("PORT".to_string(), self.backend.port.to_string()),
            ("NODE_ENV".to_string(), "development".to_string()),
        ];
        let frontend_env = vec![("VITE_API_BASE_URL".to_string(), self.api_base_url())];

        vec![
            ServiceSpec {
                name: ServiceName::Backend,
                command: self.backend.command.clone(),
                dir: self.backend.dir.clone(),
                env: backend_env,
                settle_delay: Duration::from_secs(self.backend.settle_delay_secs),
            },
            ServiceSpec {
                name: ServiceName::Frontend,
                command: self.frontend.command.clone(),
                dir: self.frontend.dir.clone(),
                env: frontend_env,
                settle_delay: Duration::from_secs(self.frontend.settle_delay_secs),
            },
        ]
    }

    /// Settings consumed by the supervisor proper.
    pub fn supervisor_settings(&self) -> SupervisorSettings {
        SupervisorSettings {
            grace_period: Duration::from_secs(self.grace_period_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            noise_markers: self.noise_markers.clone(),
        }
    }
}

/// Load the runtime configuration, merging CLI overrides on top of the file
/// (or the defaults when no file is given).
pub fn load_runtime_config(common: &CommonOptions) -> eyre::Result<RuntimeConfig> {
    let mut config = RuntimeConfig::default();

    if let Some(path) = &common.config {
        read_config_file(path)?.apply(&mut config);
    }

    if let Some(dir) = &common.backend_dir {
        config.backend.dir = dir.clone();
    }
    if let Some(dir) = &common.frontend_dir {
        config.frontend.dir = dir.clone();
    }
    if let Some(port) = common.backend_port {
        config.backend.port = port;
    }

    Ok(config)
}

fn read_config_file(path: &Path) -> eyre::Result<RuntimeConfigFile> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("unable to read config file {}", path.display()))?;
    serde_yaml::from_str(&text)
        .wrap_err_with(|| format!("invalid config file {}", path.display()))
}
