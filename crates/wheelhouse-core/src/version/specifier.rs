//! Version specifier mini-language
//!
//! A specifier is one or more comma-joined clauses. Each clause is an
//! operator from `== != < <= > >= ~=` followed by a dotted numeric version.
//! A version matches a specifier when it satisfies every clause.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use super::compare::{compare_versions, shares_prefix};

static CLAUSE_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]+(\.[0-9]+)*[A-Za-z0-9._+!-]*$").expect("clause version regex is valid")
});

/// Comparison operator of a single clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// `~=`, compatible release
    Compatible,
}

impl Operator {
    /// Two-character operators come first so `<=` is never read as `<`.
    const TOKENS: [(&'static str, Operator); 7] = [
        ("==", Operator::Eq),
        ("!=", Operator::Ne),
        ("<=", Operator::Le),
        (">=", Operator::Ge),
        ("~=", Operator::Compatible),
        ("<", Operator::Lt),
        (">", Operator::Gt),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Compatible => "~=",
        }
    }

    fn strip(clause: &str) -> Option<(Operator, &str)> {
        Self::TOKENS
            .iter()
            .find_map(|(token, op)| clause.strip_prefix(token).map(|rest| (*op, rest)))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `operator version` clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub op: Operator,
    pub version: String,
}

impl Clause {
    fn parse(raw: &str, spec: &str) -> Result<Self> {
        let clause = raw.trim();
        if clause.is_empty() {
            return Err(Error::spec_parse(spec, "empty clause"));
        }

        let (op, rest) = Operator::strip(clause).ok_or_else(|| {
            Error::spec_parse(spec, format!("clause {:?} has no comparison operator", clause))
        })?;

        let version = rest.trim();
        if !CLAUSE_VERSION_RE.is_match(version) {
            return Err(Error::spec_parse(
                spec,
                format!("clause {:?} has an invalid version {:?}", clause, version),
            ));
        }

        Ok(Self {
            op,
            version: version.to_string(),
        })
    }

    /// Evaluate this clause against a candidate version
    pub fn matches(&self, candidate: &str) -> bool {
        let cmp = compare_versions(candidate, &self.version);
        match self.op {
            Operator::Eq => cmp == Ordering::Equal,
            Operator::Ne => cmp != Ordering::Equal,
            Operator::Lt => cmp == Ordering::Less,
            Operator::Le => cmp != Ordering::Greater,
            Operator::Gt => cmp == Ordering::Greater,
            Operator::Ge => cmp != Ordering::Less,
            Operator::Compatible => {
                if cmp == Ordering::Less {
                    return false;
                }
                let segments: Vec<&str> = self.version.split('.').collect();
                match segments.split_last() {
                    Some((_, prefix)) if !prefix.is_empty() => shares_prefix(candidate, prefix),
                    _ => true,
                }
            }
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.version)
    }
}

/// A parsed, validated version specifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSpec {
    clauses: Vec<Clause>,
}

impl VersionSpec {
    /// Parse a specifier such as `">=1.0, <2.0"`
    pub fn parse(spec: &str) -> Result<Self> {
        if spec.trim().is_empty() {
            return Err(Error::spec_parse(spec, "specifier is empty"));
        }

        let clauses = spec
            .split(',')
            .map(|raw| Clause::parse(raw, spec))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { clauses })
    }

    /// True when `version` satisfies every clause
    pub fn matches(&self, version: &str) -> bool {
        self.clauses.iter().all(|c| c.matches(version))
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }
}

impl FromStr for VersionSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.clauses.iter().map(Clause::to_string).collect();
        f.write_str(&joined.join(","))
    }
}

/// Parse `spec` and evaluate it against `version`
pub fn matches_version(version: &str, spec: &str) -> Result<bool> {
    Ok(VersionSpec::parse(spec)?.matches(version))
}

/// True when `spec` parses under the specifier grammar
pub fn is_valid_specifier(spec: &str) -> bool {
    VersionSpec::parse(spec).is_ok()
}

/// True when `s` begins with a comparison operator, i.e. it is meant as a
/// range rather than an exact version
pub fn looks_like_specifier(s: &str) -> bool {
    s.trim_start().starts_with(['<', '>', '=', '!', '~'])
}
