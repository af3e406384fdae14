//! Command handlers

pub mod build;
pub mod claim;
pub mod claims;
pub mod config;
pub mod gc;
pub mod matcher;
pub mod pending;
pub mod runtimes;
pub mod version;
