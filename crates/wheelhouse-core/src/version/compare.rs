//! Segment-wise numeric version comparison
//!
//! Versions are split on `.` and compared segment by segment using the
//! leading digits of each segment. Missing trailing segments count as zero,
//! so `1.0` and `1.0.0` are equal. Anything after the leading digits of a
//! segment (`rc1`, `post2`, `+local`) is ignored for ordering: `1.0.0rc1`
//! compares equal to `1.0.0`.

use std::cmp::Ordering;

/// Compare two version strings.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a_parts: Vec<&str> = a.trim().split('.').collect();
    let b_parts: Vec<&str> = b.trim().split('.').collect();
    let len = a_parts.len().max(b_parts.len());

    for i in 0..len {
        let a_seg = a_parts.get(i).map(|s| numeric_prefix(s)).unwrap_or("");
        let b_seg = b_parts.get(i).map(|s| numeric_prefix(s)).unwrap_or("");
        match compare_digits(a_seg, b_seg) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Whether two version strings name the same release.
///
/// Stricter than `compare_versions(..) == Equal`: numeric segments compare
/// as numbers and missing trailing segments count as zero (`1.0` is
/// `1.0.0`), but segment suffixes must match, so `1.0.0rc1` is not `1.0.0`.
pub fn same_version(a: &str, b: &str) -> bool {
    let a_parts: Vec<&str> = a.trim().split('.').collect();
    let b_parts: Vec<&str> = b.trim().split('.').collect();
    let len = a_parts.len().max(b_parts.len());

    (0..len).all(|i| {
        let a_seg = a_parts.get(i).copied().unwrap_or("0");
        let b_seg = b_parts.get(i).copied().unwrap_or("0");
        let (a_num, b_num) = (numeric_prefix(a_seg), numeric_prefix(b_seg));
        compare_digits(a_num, b_num) == Ordering::Equal
            && a_seg[a_num.len()..] == b_seg[b_num.len()..]
    })
}

/// True when the first `len` segments of `version` equal those of `prefix`
/// numerically.
pub(crate) fn shares_prefix(version: &str, prefix: &[&str]) -> bool {
    let parts: Vec<&str> = version.trim().split('.').collect();
    prefix.iter().enumerate().all(|(i, want)| {
        let have = parts.get(i).map(|s| numeric_prefix(s)).unwrap_or("");
        compare_digits(have, numeric_prefix(want)) == Ordering::Equal
    })
}

/// Leading ASCII digits of a segment.
fn numeric_prefix(segment: &str) -> &str {
    let end = segment
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(segment.len());
    &segment[..end]
}

/// Compare two digit strings as unbounded non-negative integers.
/// The empty string is zero.
fn compare_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("1.0", "1.0.0", true ; "trailing zero segment")]
    #[test_case("01.2", "1.2", true ; "leading zeros")]
    #[test_case("1.0.0rc1", "1.0.0", false ; "suffix differs")]
    #[test_case("1.0.0rc1", "1.0rc1", false ; "suffix on different segment")]
    #[test_case("2.1", "2.10", false ; "numeric not lexical")]
    #[test_case("4.9.0-1", "4.9.0-1", true ; "identical with suffix")]
    fn test_same_version(a: &str, b: &str, expected: bool) {
        assert_eq!(same_version(a, b), expected);
        assert_eq!(same_version(b, a), expected);
    }

    #[test_case("1.0.0", "1.0.0", Ordering::Equal)]
    #[test_case("1.0.0", "2.0.0", Ordering::Less)]
    #[test_case("2.0.0", "1.0.0", Ordering::Greater)]
    #[test_case("1.0.0", "1.0.1", Ordering::Less)]
    #[test_case("1.0.1", "1.0.0", Ordering::Greater)]
    #[test_case("1.0", "1.0.0", Ordering::Equal)]
    #[test_case("1.10.0", "1.9.0", Ordering::Greater)]
    #[test_case("1.0.0rc1", "1.0.0", Ordering::Equal; "suffix ignored")]
    #[test_case("01.2", "1.2", Ordering::Equal; "leading zeros")]
    #[test_case("99999999999999999999999.0", "1.0", Ordering::Greater; "beyond u64")]
    fn test_compare_versions(a: &str, b: &str, want: Ordering) {
        assert_eq!(compare_versions(a, b), want);
    }

    #[test]
    fn test_shares_prefix() {
        assert!(shares_prefix("1.4.5", &["1", "4"]));
        assert!(!shares_prefix("1.40.0", &["1", "4"]));
        assert!(!shares_prefix("1.5.0", &["1", "4"]));
        assert!(shares_prefix("1.4", &["1", "4"]));
    }

    fn version_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec(0u32..200, 1..5)
            .prop_map(|segs| segs.iter().map(u32::to_string).collect::<Vec<_>>().join("."))
    }

    proptest! {
        #[test]
        fn prop_compare_is_antisymmetric(a in version_strategy(), b in version_strategy()) {
            prop_assert_eq!(compare_versions(&a, &b), compare_versions(&b, &a).reverse());
        }

        #[test]
        fn prop_trailing_zero_is_equal(a in version_strategy()) {
            let padded = format!("{}.0", a);
            prop_assert_eq!(compare_versions(&a, &padded), Ordering::Equal);
        }
    }
}
