//! Type definitions for package configuration, skips and leases

mod lease;
mod package_config;
mod skips;

pub use lease::*;
pub use package_config::*;
pub use skips::*;
