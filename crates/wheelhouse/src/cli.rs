//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use wheelhouse_core::config::AgentConfig;
use wheelhouse_core::types::ClaimType;

/// Wheelhouse - coordinated wheel building agent
#[derive(Parser, Debug)]
#[command(name = "wheelhouse")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub agent: AgentOptions,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags that override the agent configuration file
#[derive(Args, Debug, Clone, Default)]
pub struct AgentOptions {
    /// Path to the agent configuration file
    #[arg(long, global = true, env = "WHEELHOUSE_AGENT_CONFIG")]
    pub agent_config: Option<Utf8PathBuf>,

    /// Root of the shared ledger
    #[arg(long, global = true)]
    pub ledger_dir: Option<Utf8PathBuf>,

    /// Package catalog root
    #[arg(long, global = true)]
    pub packages_dir: Option<Utf8PathBuf>,

    /// Scratch directory for checkouts and build output
    #[arg(long, global = true)]
    pub work_dir: Option<Utf8PathBuf>,

    /// Agent identifier written into leases
    #[arg(long, global = true)]
    pub agent_id: Option<String>,
}

impl AgentOptions {
    /// Apply the flags on top of a loaded configuration
    pub fn apply(&self, config: &mut AgentConfig) {
        if let Some(dir) = &self.ledger_dir {
            config.ledger_dir = dir.clone();
        }
        if let Some(dir) = &self.packages_dir {
            config.packages_dir = dir.clone();
        }
        if let Some(dir) = &self.work_dir {
            config.work_dir = dir.clone();
        }
        if let Some(id) = &self.agent_id {
            config.agent_id = Some(id.clone());
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version(VersionArgs),

    /// Claim a package in the ledger
    Claim(ClaimArgs),

    /// Release a package's lease
    Release(ReleaseArgs),

    /// List current leases
    Claims(ClaimsArgs),

    /// Reclaim leases held past their TTL
    Gc(GcArgs),

    /// Manage the pending-work set
    #[command(subcommand)]
    Pending(PendingCommands),

    /// Claim a package and build its version x runtime matrix
    Build(BuildArgs),

    /// Build the next pending package that can be claimed
    Next(NextArgs),

    /// Inspect package configurations
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Check a version against a specifier
    Match(MatchArgs),

    /// Show configured runtimes and host tooling
    Runtimes(RuntimesArgs),
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ClaimArgs {
    /// Package name
    pub package: String,

    /// Kind of work the lease is taken for
    #[arg(long = "type", value_name = "TYPE", default_value_t = ClaimType::Build)]
    pub claim_type: ClaimType,
}

#[derive(Args, Debug)]
pub struct ReleaseArgs {
    /// Package name
    pub package: String,
}

#[derive(Args, Debug)]
pub struct ClaimsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct GcArgs {
    /// Lease TTL in seconds (defaults to the agent configuration)
    #[arg(long)]
    pub ttl_secs: Option<u64>,

    /// Report what would be reclaimed without deleting anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug)]
pub enum PendingCommands {
    /// Mark a package as waiting for its first build
    Add(PendingPackageArgs),

    /// List pending packages
    List(PendingListArgs),

    /// Remove a package from the pending set
    Remove(PendingPackageArgs),
}

#[derive(Args, Debug)]
pub struct PendingPackageArgs {
    /// Package name
    pub package: String,
}

#[derive(Args, Debug)]
pub struct PendingListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Matrix selection shared by `build` and `next`
#[derive(Args, Debug, Clone, Default)]
pub struct MatrixArgs {
    /// Runtime to build for (repeatable; defaults to the agent configuration)
    #[arg(long = "python", value_name = "VERSION")]
    pub pythons: Vec<String>,

    /// Only build this version (repeatable)
    #[arg(long = "only", value_name = "VERSION")]
    pub versions: Vec<String>,

    /// Drop this version from the build and from the committed config (repeatable)
    #[arg(long = "exclude", value_name = "VERSION")]
    pub exclude: Vec<String>,
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Package name
    pub package: String,

    /// Kind of work the lease is taken for
    #[arg(long = "type", value_name = "TYPE", default_value_t = ClaimType::Build)]
    pub claim_type: ClaimType,

    #[command(flatten)]
    pub matrix: MatrixArgs,
}

#[derive(Args, Debug)]
pub struct NextArgs {
    /// Kind of work the lease is taken for
    #[arg(long = "type", value_name = "TYPE", default_value_t = ClaimType::Build)]
    pub claim_type: ClaimType,

    #[command(flatten)]
    pub matrix: MatrixArgs,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Load and validate a package's config and skips
    Validate(ConfigValidateArgs),

    /// Print the effective configuration of one version
    Resolve(ConfigResolveArgs),
}

#[derive(Args, Debug)]
pub struct ConfigValidateArgs {
    /// Package name in the catalog, or a path to a config file
    pub target: String,
}

#[derive(Args, Debug)]
pub struct ConfigResolveArgs {
    /// Package name
    pub package: String,

    /// Version to resolve for
    pub version: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct MatchArgs {
    /// Version to test
    pub version: String,

    /// Specifier such as ">=1.0,<2.0" or "~=1.4.2"
    pub specifier: String,
}

#[derive(Args, Debug)]
pub struct RuntimesArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
