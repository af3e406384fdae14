//! Common test utilities for wheelhouse-builder
//!
//! - `ScriptedRunner`: a `CommandRunner` that plays git, apk and the build
//!   command without spawning anything, writing wheels into dist on success
//! - fixtures for package configs and orchestrators

#![allow(dead_code)]

pub mod fixtures;
pub mod scripted_runner;

pub use fixtures::*;
pub use scripted_runner::*;
