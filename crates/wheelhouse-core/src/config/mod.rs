//! Agent runtime configuration and its loader

mod agent;
mod loader;

pub use agent::{lease_ttl_from_secs, AgentConfig};
pub use loader::{validate_agent_config, AgentConfigLoader};
