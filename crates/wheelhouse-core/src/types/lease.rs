//! Lease documents stored in the ledger (`claims/{name}.yaml`)

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of work a lease was taken for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimType {
    /// Initial build of a new package
    #[default]
    Build,
    /// Adding newly released versions
    Version,
    /// Retrying recorded skips
    Fixer,
}

impl ClaimType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimType::Build => "build",
            ClaimType::Version => "version",
            ClaimType::Fixer => "fixer",
        }
    }
}

impl fmt::Display for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "build" => Ok(ClaimType::Build),
            "version" => Ok(ClaimType::Version),
            "fixer" => Ok(ClaimType::Fixer),
            other => Err(Error::validation(format!(
                "unknown claim type {:?} (expected build, version or fixer)",
                other
            ))),
        }
    }
}

/// Time-bounded ownership of one package by one agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    /// Identifier of the agent holding the lease
    pub agent: String,

    /// When the lease was taken
    pub claimed_at: DateTime<Utc>,

    /// Kind of work being done
    #[serde(rename = "type", default)]
    pub claim_type: ClaimType,
}

impl Lease {
    pub fn new(agent: impl Into<String>, claim_type: ClaimType, claimed_at: DateTime<Utc>) -> Self {
        Self {
            agent: agent.into(),
            claimed_at,
            claim_type,
        }
    }

    /// `now - claimed_at > ttl`
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.claimed_at > ttl
    }

    /// Time held so far
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.claimed_at
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(content)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}
