pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "SCALEFLOW_CONFIG_PATH";
pub const INITIAL_DELAY_ENV: &str = "SCALEFLOW_INITIAL_DELAY_SECS";
pub const POLL_INTERVAL_ENV: &str = "SCALEFLOW_POLL_INTERVAL_SECS";
pub const TIMEOUT_ENV: &str = "SCALEFLOW_TIMEOUT_SECS";
pub const SERIALIZE_API_CALLS_ENV: &str = "SCALEFLOW_SERIALIZE_API_CALLS";

const CONFIG_FILE: &str = "lifecycle.yaml";

/// Upper bound for every wait setting (one year)
pub const MAX_WAIT_SECS: u64 = 365 * 24 * 60 * 60;

/// Timing and locking policy shared by every lifecycle operation
///
/// All callers of one lifecycle coordinator see the same values, which keeps
/// task polling predictable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Wait before the first task status poll
    pub initial_delay_secs: u64,

    /// Minimum wait between two task status polls
    pub poll_interval_secs: u64,

    /// Give up waiting for a task after this long
    pub timeout_secs: u64,

    /// Funnel every control-plane call through one process-wide lock
    pub serialize_api_calls: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: 15,
            poll_interval_secs: 10,
            timeout_secs: 60 * 60,
            serialize_api_calls: true,
        }
    }
}

impl LifecycleConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }
        for (name, value) in [
            ("initial_delay_secs", self.initial_delay_secs),
            ("poll_interval_secs", self.poll_interval_secs),
            ("timeout_secs", self.timeout_secs),
        ] {
            if value > MAX_WAIT_SECS {
                return Err(ConfigError::Invalid(format!(
                    "{name} must not exceed {MAX_WAIT_SECS}"
                )));
            }
        }
        Ok(())
    }

    /// Load the configuration file and apply environment overrides
    ///
    /// Lookup order:
    /// 1. `SCALEFLOW_CONFIG_PATH` (direct path)
    /// 2. `<config dir>/scaleflow/lifecycle.yaml`
    /// 3. built-in defaults
    pub fn load() -> Result<Self> {
        let mut config = match find_config_file() {
            Some(path) => Self::load_from(&path)?,
            None => {
                tracing::debug!("No lifecycle config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML configuration file. Missing keys take their defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: LifecycleConfig = serde_yaml::from_str(&content)?;
        tracing::debug!("Loaded lifecycle config from {}", path.display());
        Ok(config)
    }

    /// Override values from `SCALEFLOW_*` environment variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env_u64(INITIAL_DELAY_ENV)? {
            self.initial_delay_secs = v;
        }
        if let Some(v) = env_u64(POLL_INTERVAL_ENV)? {
            self.poll_interval_secs = v;
        }
        if let Some(v) = env_u64(TIMEOUT_ENV)? {
            self.timeout_secs = v;
        }
        if let Some(v) = env_bool(SERIALIZE_API_CALLS_ENV)? {
            self.serialize_api_calls = v;
        }
        Ok(())
    }
}

/// Locate the lifecycle configuration file, if any
pub fn find_config_file() -> Option<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Some(path);
        }
        tracing::warn!(
            "{} points to a missing file: {}",
            CONFIG_PATH_ENV,
            path.display()
        );
    }

    let global = dirs::config_dir()?.join("scaleflow").join(CONFIG_FILE);
    global.exists().then_some(global)
}

fn env_u64(key: &'static str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { key, value }),
        Err(_) => Ok(None),
    }
}

fn env_bool(key: &'static str) -> Result<Option<bool>> {
    match std::env::var(key) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidEnv { key, value }),
        },
        Err(_) => Ok(None),
    }
}
