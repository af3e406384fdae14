//! Agent runtime configuration

use crate::error::{Error, Result};
use crate::utils::absolute_path;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Operational settings of one agent process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Identifier written into leases. Generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,

    /// Root of the filesystem ledger
    pub ledger_dir: Utf8PathBuf,

    /// Package catalog root
    pub packages_dir: Utf8PathBuf,

    /// Scratch root for checkouts and build output
    pub work_dir: Utf8PathBuf,

    /// Lease time-to-live before the garbage collector may reclaim it
    pub lease_ttl_secs: u64,

    /// Wall-clock limit for a single build command
    pub build_timeout_secs: u64,

    /// Supported runtime set
    pub python_versions: Vec<String>,

    /// Directory containing `python3.x` interpreters
    pub python_bin_dir: Utf8PathBuf,

    /// Platform tag of produced wheels
    pub platform: String,

    /// How many runtimes of one version may build at once
    pub max_parallel_runtimes: usize,
}

/// Partial agent configuration as found in a user file
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct AgentConfigOverlay {
    pub agent_id: Option<String>,
    pub ledger_dir: Option<Utf8PathBuf>,
    pub packages_dir: Option<Utf8PathBuf>,
    pub work_dir: Option<Utf8PathBuf>,
    pub lease_ttl_secs: Option<u64>,
    pub build_timeout_secs: Option<u64>,
    pub python_versions: Option<Vec<String>>,
    pub python_bin_dir: Option<Utf8PathBuf>,
    pub platform: Option<String>,
    pub max_parallel_runtimes: Option<usize>,
}

impl AgentConfig {
    pub fn lease_ttl(&self) -> Result<chrono::Duration> {
        lease_ttl_from_secs(self.lease_ttl_secs)
    }

    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build_timeout_secs)
    }

    /// The configured agent id, or a generated `{host}-{uuid8}` one
    pub fn resolved_agent_id(&self) -> String {
        if let Some(id) = self.agent_id.as_deref().filter(|id| !id.trim().is_empty()) {
            return id.to_string();
        }
        let host = std::env::var("HOSTNAME")
            .ok()
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "agent".to_string());
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("{}-{}", host, &suffix[..8])
    }

    /// Resolve the ledger, catalog and work directories against the
    /// current directory
    pub fn absolutize_paths(&mut self) -> Result<()> {
        self.ledger_dir = absolute_path(&self.ledger_dir)?;
        self.packages_dir = absolute_path(&self.packages_dir)?;
        self.work_dir = absolute_path(&self.work_dir)?;
        Ok(())
    }

    pub(crate) fn apply(&mut self, overlay: AgentConfigOverlay) {
        if overlay.agent_id.is_some() {
            self.agent_id = overlay.agent_id;
        }
        if let Some(v) = overlay.ledger_dir {
            self.ledger_dir = v;
        }
        if let Some(v) = overlay.packages_dir {
            self.packages_dir = v;
        }
        if let Some(v) = overlay.work_dir {
            self.work_dir = v;
        }
        if let Some(v) = overlay.lease_ttl_secs {
            self.lease_ttl_secs = v;
        }
        if let Some(v) = overlay.build_timeout_secs {
            self.build_timeout_secs = v;
        }
        if let Some(v) = overlay.python_versions {
            self.python_versions = v;
        }
        if let Some(v) = overlay.python_bin_dir {
            self.python_bin_dir = v;
        }
        if let Some(v) = overlay.platform {
            self.platform = v;
        }
        if let Some(v) = overlay.max_parallel_runtimes {
            self.max_parallel_runtimes = v;
        }
    }
}

/// A lease TTL as a duration, rejecting values chrono cannot represent
pub fn lease_ttl_from_secs(secs: u64) -> Result<chrono::Duration> {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| Error::invalid_config(format!("lease TTL of {} seconds is too large", secs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfigLoader;

    #[test]
    fn test_lease_ttl() {
        let mut config = AgentConfigLoader::load_defaults().unwrap();
        config.lease_ttl_secs = 600;
        assert_eq!(config.lease_ttl().unwrap(), chrono::Duration::minutes(10));
    }

    #[test]
    fn test_oversized_lease_ttl_is_rejected() {
        let mut config = AgentConfigLoader::load_defaults().unwrap();
        config.lease_ttl_secs = 10_000_000_000_000_000;
        assert!(matches!(
            config.lease_ttl(),
            Err(Error::InvalidConfig { .. })
        ));
        assert!(lease_ttl_from_secs(u64::MAX).is_err());
    }

    #[test]
    fn test_absolutize_paths() {
        let mut config = AgentConfigLoader::load_defaults().unwrap();
        config.ledger_dir = "/srv/ledger".into();
        config.packages_dir = "packages".into();
        config.work_dir = "work".into();
        config.absolutize_paths().unwrap();

        let cwd = Utf8PathBuf::from_path_buf(std::env::current_dir().unwrap()).unwrap();
        assert_eq!(config.ledger_dir, Utf8PathBuf::from("/srv/ledger"));
        assert_eq!(config.packages_dir, cwd.join("packages"));
        assert_eq!(config.work_dir, cwd.join("work"));
    }
}
