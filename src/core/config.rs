use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Variable selecting the root directory of all environments.
pub const ENV_DIR_VAR: &str = "DOCKER_ENV_DIR";

/// Prefix of the layered `STACKCTL_*` overrides.
pub const ENV_PREFIX: &str = "STACKCTL";

pub const DEFAULT_ENV_DIR: &str = "./environments";
pub const DEFAULT_COMPOSE_COMMAND: &str = "docker compose";
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub env_dir: PathBuf,
    pub compose_command: String,
    pub command_timeout_secs: u64,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env_dir: PathBuf::from(DEFAULT_ENV_DIR),
            compose_command: DEFAULT_COMPOSE_COMMAND.to_string(),
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl Settings {
    /// Layer defaults, an optional config file, `STACKCTL_*` variables and
    /// finally `DOCKER_ENV_DIR`.
    ///
    /// Without an explicit path, `stackctl.toml` in the working directory is
    /// read when present.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let defaults = Settings::default();

        let file = match config_file {
            Some(path) => File::from(path.to_path_buf()).required(true),
            None => File::with_name("stackctl").required(false),
        };

        let settings = Config::builder()
            .set_default("env_dir", defaults.env_dir.to_string_lossy().to_string())?
            .set_default("compose_command", defaults.compose_command)?
            .set_default("command_timeout_secs", defaults.command_timeout_secs as i64)?
            .set_default("log_level", defaults.log_level)?
            .set_default("log_json", defaults.log_json)?
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .set_override_option("env_dir", std::env::var(ENV_DIR_VAR).ok())?
            .build()
            .context("Failed to load configuration")?;

        settings
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Split the compose command into program and leading arguments.
    pub fn compose_program(&self) -> Result<(String, Vec<String>)> {
        let mut parts = self.compose_command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .context("compose_command must not be empty")?;
        Ok((program, parts.collect()))
    }
}
