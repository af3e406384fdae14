//! Version comparison and the version specifier mini-language
//!
//! This is a deliberately small subset of PEP 440: numeric segments only,
//! no pre-release ordering, no wildcards.

mod compare;
mod specifier;

pub use compare::{compare_versions, same_version};
pub use specifier::{
    is_valid_specifier, looks_like_specifier, matches_version, Clause, Operator, VersionSpec,
};
