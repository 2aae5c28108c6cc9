//! Relative posting-date text ("3 days ago") to absolute timestamps.

use std::sync::LazyLock;

use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;

/// Rules in priority order. A month is a flat 30 days.
static RULES: LazyLock<Vec<(Regex, fn(i64) -> Option<TimeDelta>)>> = LazyLock::new(|| {
    let rule = |pattern: &str, offset: fn(i64) -> Option<TimeDelta>| {
        (Regex::new(pattern).expect("static date pattern"), offset)
    };
    vec![
        rule(r"(\d+)\s*days?\s*ago", TimeDelta::try_days),
        rule(r"(\d+)\s*hours?\s*ago", TimeDelta::try_hours),
        rule(r"(\d+)\s*weeks?\s*ago", TimeDelta::try_weeks),
        rule(r"(\d+)\s*months?\s*ago", |n| {
            n.checked_mul(30).and_then(TimeDelta::try_days)
        }),
    ]
});

/// Resolve `text` against `now`. Anything unrecognised resolves to `now`.
pub fn normalize_at(text: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(text) = text else {
        return now;
    };
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return now;
    }

    for (pattern, offset) in RULES.iter() {
        if let Some(caps) = pattern.captures(&text) {
            // First matching rule decides, even when its number is unusable.
            return caps[1]
                .parse::<i64>()
                .ok()
                .and_then(*offset)
                .and_then(|delta| now.checked_sub_signed(delta))
                .unwrap_or(now);
        }
    }
    now
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use proptest::prelude::*;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn each_unit() {
        let now = now();
        assert_eq!(normalize_at(Some("3 days ago"), now), now - TimeDelta::days(3));
        assert_eq!(normalize_at(Some("1 day ago"), now), now - TimeDelta::days(1));
        assert_eq!(normalize_at(Some("5 hours ago"), now), now - TimeDelta::hours(5));
        assert_eq!(normalize_at(Some("2 weeks ago"), now), now - TimeDelta::weeks(2));
        assert_eq!(normalize_at(Some("2 months ago"), now), now - TimeDelta::days(60));
    }

    #[test]
    fn case_and_surrounding_text() {
        let now = now();
        assert_eq!(
            normalize_at(Some("Posted 4 DAYS AGO"), now),
            now - TimeDelta::days(4)
        );
        assert_eq!(normalize_at(Some("12hours ago"), now), now - TimeDelta::hours(12));
    }

    #[test]
    fn days_take_priority() {
        let now = now();
        assert_eq!(
            normalize_at(Some("1 month ago, updated 2 days ago"), now),
            now - TimeDelta::days(2)
        );
    }

    #[test]
    fn unparseable_is_now() {
        let now = now();
        assert_eq!(normalize_at(None, now), now);
        assert_eq!(normalize_at(Some(""), now), now);
        assert_eq!(normalize_at(Some("   "), now), now);
        assert_eq!(normalize_at(Some("yesterday"), now), now);
        assert_eq!(normalize_at(Some("2024-01-01"), now), now);
        assert_eq!(normalize_at(Some("a few days ago"), now), now);
    }

    #[test]
    fn huge_numbers_fall_back_to_now() {
        let now = now();
        assert_eq!(normalize_at(Some("99999999999999999999 days ago"), now), now);
        assert_eq!(normalize_at(Some("9223372036854775807 months ago"), now), now);
    }

    proptest! {
        #[test]
        fn offsets_match_unit(n in 0i64..5000, unit in 0usize..4, plural in any::<bool>()) {
            let now = now();
            let (name, expected) = match unit {
                0 => ("day", TimeDelta::days(n)),
                1 => ("hour", TimeDelta::hours(n)),
                2 => ("week", TimeDelta::weeks(n)),
                _ => ("month", TimeDelta::days(n * 30)),
            };
            let suffix = if plural { "s" } else { "" };
            let text = format!("{n} {name}{suffix} ago");
            prop_assert_eq!(normalize_at(Some(&text), now), now - expected);
        }

        #[test]
        fn never_panics(text in ".*") {
            let now = now();
            let _ = normalize_at(Some(&text), now);
        }
    }
}
