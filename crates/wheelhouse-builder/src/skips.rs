//! Folding attempt results into the skip ledger
//!
//! For each version that was built:
//! - runtimes that now succeed are removed from that version's exact entries,
//!   and entries left without runtimes are dropped
//! - the failed runtimes form one set; an entry for the same version whose
//!   runtimes attempted in this run are exactly that set has its `attempts`
//!   bumped and its reason and log refreshed, otherwise a new entry starts
//!   at one attempt
//! - runtimes of a matched entry that were not attempted are split off into
//!   their own entry, unchanged
//!
//! Range entries and entries for versions not in this run are kept as is.

use crate::attempt::BuildAttemptResult;
use wheelhouse_core::types::{SkipEntry, Skips};
use wheelhouse_core::version::same_version;

pub fn fold_skips(existing: &Skips, results: &[BuildAttemptResult]) -> Skips {
    let mut entries = existing.skips.clone();

    for version in versions_in_order(results) {
        let attempts: Vec<&BuildAttemptResult> =
            results.iter().filter(|r| r.version == version).collect();
        let attempted: Vec<&str> = attempts.iter().map(|r| r.python.as_str()).collect();
        let passed: Vec<&str> = attempts
            .iter()
            .filter(|r| r.success())
            .map(|r| r.python.as_str())
            .collect();
        let failed: Vec<&BuildAttemptResult> =
            attempts.iter().copied().filter(|r| !r.success()).collect();

        if !passed.is_empty() {
            for entry in entries.iter_mut().filter(|e| is_entry_for(e, &version)) {
                entry.python.retain(|py| !passed.contains(&py.as_str()));
            }
            entries.retain(|e| !e.python.is_empty());
        }

        let Some(first) = failed.first() else {
            continue;
        };
        let runtimes: Vec<String> = failed.iter().map(|r| r.python.clone()).collect();
        let reason = first
            .reason()
            .unwrap_or_else(|| "build failed".to_string());
        let log = failed.iter().find_map(|r| r.log_ref.clone());

        let matched = entries.iter().position(|e| {
            is_entry_for(e, &version) && attempted_part(e, &attempted).same_runtimes(&runtimes)
        });
        match matched {
            Some(i) => {
                let untouched: Vec<String> = entries[i]
                    .python
                    .iter()
                    .filter(|py| !attempted.contains(&py.as_str()))
                    .cloned()
                    .collect();
                if !untouched.is_empty() {
                    let mut rest = entries[i].clone();
                    rest.python = untouched;
                    entries[i].python.retain(|py| attempted.contains(&py.as_str()));
                    entries.insert(i + 1, rest);
                }

                let entry = &mut entries[i];
                entry.attempts = entry.attempts.saturating_add(1);
                entry.reason = reason;
                entry.log = log;
                tracing::debug!(
                    "Skip for {} {:?} now at {} attempts",
                    version,
                    runtimes,
                    entry.attempts
                );
            }
            None => {
                let mut entry = SkipEntry::new(version.clone(), runtimes, reason);
                entry.log = log;
                entry.attempts = 1;
                entries.push(entry);
            }
        }
    }

    Skips::new(entries)
}

fn is_entry_for(entry: &SkipEntry, version: &str) -> bool {
    entry.is_exact() && same_version(&entry.version, version)
}

/// The entry restricted to the runtimes attempted in this run
fn attempted_part(entry: &SkipEntry, attempted: &[&str]) -> SkipEntry {
    let mut part = entry.clone();
    part.python.retain(|py| attempted.contains(&py.as_str()));
    part
}

fn versions_in_order(results: &[BuildAttemptResult]) -> Vec<String> {
    let mut versions: Vec<String> = Vec::new();
    for result in results {
        if !versions.contains(&result.version) {
            versions.push(result.version.clone());
        }
    }
    versions
}
