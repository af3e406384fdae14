//! Hierarchical agent configuration loader
//!
//! Precedence (low to high):
//! 1. Embedded defaults (built into the binary)
//! 2. Agent config file (`~/.wheelhouse/agent.yaml` or an explicit path)
//! 3. Environment variables (`WHEELHOUSE_*`)
//! 4. CLI flags (handled by the caller)

use super::agent::{AgentConfig, AgentConfigOverlay};
use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use rust_embed::RustEmbed;
use std::env;
use std::fs;
use std::str::FromStr;

/// Embedded configuration files
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../embedded/config/"]
#[prefix = ""]
struct EmbeddedConfigs;

const DEFAULTS_FILE: &str = "agent-defaults.yaml";

/// Loads `AgentConfig` from defaults, file and environment
pub struct AgentConfigLoader {
    config_file: Option<Utf8PathBuf>,
    explicit: bool,
}

impl AgentConfigLoader {
    /// Loader reading `~/.wheelhouse/agent.yaml` when it exists
    pub fn new() -> Self {
        let config_file = dirs::home_dir()
            .and_then(|home| Utf8PathBuf::from_path_buf(home).ok())
            .map(|home| home.join(".wheelhouse").join("agent.yaml"));
        Self {
            config_file,
            explicit: false,
        }
    }

    /// Loader reading a specific file, which must exist
    pub fn with_file(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            config_file: Some(path.into()),
            explicit: true,
        }
    }

    /// Loader that only uses embedded defaults and the environment
    pub fn without_file() -> Self {
        Self {
            config_file: None,
            explicit: false,
        }
    }

    pub fn load(&self) -> Result<AgentConfig> {
        let mut config = Self::load_defaults()?;

        if let Some(path) = &self.config_file {
            if path.exists() {
                config.apply(Self::load_overlay(path)?);
                tracing::debug!("loaded agent config from {}", path);
            } else if self.explicit {
                return Err(Error::config_not_found(path.as_str()));
            }
        }

        Self::apply_env_overrides(&mut config)?;
        validate_agent_config(&config)?;
        Ok(config)
    }

    /// Embedded defaults only
    pub fn load_defaults() -> Result<AgentConfig> {
        let file = EmbeddedConfigs::get(DEFAULTS_FILE).ok_or_else(|| {
            Error::config_not_found(format!("Embedded config not found: {}", DEFAULTS_FILE))
        })?;
        let content = std::str::from_utf8(&file.data).map_err(|_| {
            Error::invalid_config(format!("Invalid UTF-8 in embedded config: {}", DEFAULTS_FILE))
        })?;
        serde_yaml_ng::from_str(content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to parse embedded config {}: {}",
                DEFAULTS_FILE, e
            ))
        })
    }

    fn load_overlay(path: &Utf8Path) -> Result<AgentConfigOverlay> {
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(AgentConfigOverlay::default());
        }
        serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))
    }

    fn apply_env_overrides(config: &mut AgentConfig) -> Result<()> {
        if let Ok(val) = env::var("WHEELHOUSE_AGENT_ID") {
            config.agent_id = Some(val);
        }
        if let Ok(val) = env::var("WHEELHOUSE_LEDGER_DIR") {
            config.ledger_dir = val.into();
        }
        if let Ok(val) = env::var("WHEELHOUSE_PACKAGES_DIR") {
            config.packages_dir = val.into();
        }
        if let Ok(val) = env::var("WHEELHOUSE_WORK_DIR") {
            config.work_dir = val.into();
        }
        if let Some(val) = parse_env::<u64>("WHEELHOUSE_LEASE_TTL_SECS")? {
            config.lease_ttl_secs = val;
        }
        if let Some(val) = parse_env::<u64>("WHEELHOUSE_BUILD_TIMEOUT_SECS")? {
            config.build_timeout_secs = val;
        }
        if let Ok(val) = env::var("WHEELHOUSE_PYTHON_VERSIONS") {
            config.python_versions = val
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(val) = env::var("WHEELHOUSE_PLATFORM") {
            config.platform = val;
        }
        if let Some(val) = parse_env::<usize>("WHEELHOUSE_MAX_PARALLEL_RUNTIMES")? {
            config.max_parallel_runtimes = val;
        }
        Ok(())
    }
}

impl Default for AgentConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_env<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::invalid_config(format!("{} must be a valid number", name))),
        Err(_) => Ok(None),
    }
}

/// Reject settings no agent can run with
pub fn validate_agent_config(config: &AgentConfig) -> Result<()> {
    if config.python_versions.is_empty() {
        return Err(Error::invalid_config("python_versions must not be empty"));
    }
    if config.lease_ttl_secs == 0 {
        return Err(Error::invalid_config("lease_ttl_secs must be positive"));
    }
    config.lease_ttl()?;
    if config.build_timeout_secs == 0 {
        return Err(Error::invalid_config("build_timeout_secs must be positive"));
    }
    if config.max_parallel_runtimes == 0 {
        return Err(Error::invalid_config("max_parallel_runtimes must be at least 1"));
    }
    Ok(())
}
