//! Per-invocation agent context
//!
//! Loads the agent configuration, applies CLI overrides and hands out the
//! ledger and catalog handles the commands work with.

use crate::cli::AgentOptions;
use anyhow::{Context, Result};
use std::sync::Arc;
use wheelhouse_core::{AgentConfig, AgentConfigLoader, PackageCatalog};
use wheelhouse_ledger::{ClaimManager, FsLedgerStore, LedgerStore, PendingQueue};

pub struct AgentContext {
    pub config: AgentConfig,
    pub agent_id: String,
    pub catalog: PackageCatalog,
}

impl AgentContext {
    pub fn load(options: &AgentOptions) -> Result<Self> {
        let loader = match &options.agent_config {
            Some(path) => AgentConfigLoader::with_file(path.clone()),
            None => AgentConfigLoader::new(),
        };
        let mut config = loader
            .load()
            .context("Failed to load agent configuration")?;
        options.apply(&mut config);
        config
            .absolutize_paths()
            .context("Failed to resolve agent directories")?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: AgentConfig) -> Self {
        let agent_id = config.resolved_agent_id();
        let catalog = PackageCatalog::new(config.packages_dir.clone());
        tracing::debug!(
            agent = %agent_id,
            ledger = %config.ledger_dir,
            packages = %config.packages_dir,
            "Agent context ready"
        );
        Self {
            config,
            agent_id,
            catalog,
        }
    }

    /// Open the filesystem ledger, creating its root on first use
    pub fn store(&self) -> Result<Arc<dyn LedgerStore>> {
        let store = FsLedgerStore::open(self.config.ledger_dir.clone())
            .with_context(|| format!("Failed to open ledger at {}", self.config.ledger_dir))?;
        Ok(Arc::new(store))
    }

    pub fn claims(&self) -> Result<ClaimManager> {
        Ok(ClaimManager::new(self.store()?))
    }

    pub fn queue(&self) -> Result<PendingQueue> {
        Ok(PendingQueue::new(self.store()?))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::AgentContext;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;
    use wheelhouse_core::AgentConfigLoader;

    /// Context rooted in a temporary directory
    pub fn temp_context() -> (TempDir, AgentContext) {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let mut config = AgentConfigLoader::load_defaults().unwrap();
        config.agent_id = Some("test-agent".to_string());
        config.ledger_dir = root.join("ledger");
        config.packages_dir = root.join("packages");
        config.work_dir = root.join("work");
        (dir, AgentContext::from_config(config))
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::temp_context;
    use super::AgentContext;
    use crate::cli::AgentOptions;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;
    use wheelhouse_core::types::ClaimType;

    #[test]
    fn test_relative_directories_become_absolute() {
        let dir = TempDir::new().unwrap();
        let file = Utf8PathBuf::from_path_buf(dir.path().join("agent.yaml")).unwrap();
        std::fs::write(&file, "agent_id: builder-1\nwork_dir: scratch/work\n").unwrap();

        let options = AgentOptions {
            agent_config: Some(file),
            ledger_dir: Some("/srv/ledger".into()),
            packages_dir: Some("catalog".into()),
            ..Default::default()
        };
        let ctx = AgentContext::load(&options).unwrap();

        let cwd = Utf8PathBuf::from_path_buf(std::env::current_dir().unwrap()).unwrap();
        assert_eq!(ctx.config.work_dir, cwd.join("scratch/work"));
        assert_eq!(ctx.config.packages_dir, cwd.join("catalog"));
        assert_eq!(ctx.config.ledger_dir, Utf8PathBuf::from("/srv/ledger"));
        assert_eq!(ctx.catalog.root(), cwd.join("catalog").as_path());
    }

    #[test]
    fn test_configured_agent_id_is_used() {
        let (_dir, ctx) = temp_context();
        assert_eq!(ctx.agent_id, "test-agent");
        assert_eq!(ctx.catalog.root(), ctx.config.packages_dir.as_path());
    }

    #[test]
    fn test_store_handles_share_the_ledger() {
        let (_dir, ctx) = temp_context();
        let first = ctx.claims().unwrap();
        let second = ctx.claims().unwrap();

        assert!(first
            .acquire("numpy", &ctx.agent_id, ClaimType::Build)
            .unwrap()
            .is_acquired());
        assert!(!second
            .acquire("numpy", "other-agent", ClaimType::Build)
            .unwrap()
            .is_acquired());
        assert!(ctx.config.ledger_dir.join("claims").is_dir());
    }
}
