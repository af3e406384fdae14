//! Lease listing

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tabled::Tabled;
use wheelhouse_ledger::{ClaimManager, LeaseRecord};

use crate::cli::{AgentOptions, ClaimsArgs};
use crate::context::AgentContext;
use crate::output;

#[derive(Tabled)]
struct ClaimRow {
    package: String,
    agent: String,
    #[tabled(rename = "type")]
    claim_type: String,
    age: String,
    expired: String,
}

#[derive(Serialize)]
struct ClaimJson {
    #[serde(flatten)]
    record: LeaseRecord,
    age_secs: i64,
    expired: bool,
}

pub fn run(args: ClaimsArgs, options: &AgentOptions) -> Result<()> {
    let ctx = AgentContext::load(options)?;
    let records = ctx.claims()?.list().context("Failed to list claims")?;
    let ttl = ctx.config.lease_ttl()?;
    let now = Utc::now();

    if args.json {
        let entries: Vec<ClaimJson> = records
            .into_iter()
            .map(|record| to_json(record, now, ttl))
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let rows: Vec<ClaimRow> = records.iter().map(|r| to_row(r, now, ttl)).collect();
    output::table(rows, "No packages are claimed");
    Ok(())
}

fn to_row(record: &LeaseRecord, now: DateTime<Utc>, ttl: Duration) -> ClaimRow {
    let expired = ClaimManager::is_expired(&record.lease, now, ttl);
    ClaimRow {
        package: record.package.clone(),
        agent: record.lease.agent.clone(),
        claim_type: record.lease.claim_type.to_string(),
        age: format_age(record.lease.age(now)),
        expired: if expired { "yes" } else { "no" }.to_string(),
    }
}

fn to_json(record: LeaseRecord, now: DateTime<Utc>, ttl: Duration) -> ClaimJson {
    ClaimJson {
        age_secs: record.lease.age(now).num_seconds(),
        expired: ClaimManager::is_expired(&record.lease, now, ttl),
        record,
    }
}

/// Compact age such as `45s`, `12m`, `3h 05m` or `2d 4h`
pub(crate) fn format_age(age: Duration) -> String {
    let secs = age.num_seconds().max(0);
    let (days, hours, mins) = (secs / 86_400, (secs % 86_400) / 3_600, (secs % 3_600) / 60);
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {:02}m", hours, mins)
    } else if mins > 0 {
        format!("{}m", mins)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wheelhouse_core::types::{ClaimType, Lease};

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Duration::seconds(45)), "45s");
        assert_eq!(format_age(Duration::seconds(12 * 60 + 3)), "12m");
        assert_eq!(format_age(Duration::seconds(3 * 3600 + 5 * 60)), "3h 05m");
        assert_eq!(format_age(Duration::seconds(2 * 86_400 + 4 * 3600)), "2d 4h");
        assert_eq!(format_age(Duration::seconds(-30)), "0s");
    }

    #[test]
    fn test_row_marks_expired_leases() {
        let claimed = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let record = LeaseRecord {
            package: "pillow".to_string(),
            lease: Lease::new("agent-a", ClaimType::Version, claimed),
        };
        let ttl = Duration::hours(6);

        let fresh = to_row(&record, claimed + Duration::hours(1), ttl);
        assert_eq!(fresh.expired, "no");
        assert_eq!(fresh.claim_type, "version");
        assert_eq!(fresh.age, "1h 00m");

        let stale = to_json(record, claimed + Duration::hours(7), ttl);
        assert!(stale.expired);
        assert_eq!(stale.age_secs, 7 * 3600);
    }

    #[test]
    fn test_json_flattens_lease_fields() {
        let claimed = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let record = LeaseRecord {
            package: "pillow".to_string(),
            lease: Lease::new("agent-a", ClaimType::Build, claimed),
        };
        let json = serde_json::to_value(to_json(record, claimed, Duration::hours(6))).unwrap();
        assert_eq!(json["package"], "pillow");
        assert_eq!(json["agent"], "agent-a");
        assert_eq!(json["type"], "build");
        assert_eq!(json["expired"], false);
    }
}
