//! Range selectors and the policy table that drives range queries
//!
//! Every selector maps to one row of [`POLICIES`]: how far back the window
//! reaches, how rows are grouped and how bucket labels are formatted. The
//! store builds its SQL from the row, so adding a range is a table edit.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A requested chart range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RangeSelector {
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
}

impl RangeSelector {
    /// Parse a selector; anything unrecognized means the 30 day range
    pub fn parse(value: &str) -> Self {
        match value {
            "24h" => RangeSelector::Day,
            "7d" => RangeSelector::Week,
            _ => RangeSelector::Month,
        }
    }

    /// Selector from an optional query parameter; absent means the 7 day range
    pub fn from_query(value: Option<&str>) -> Self {
        value.map(Self::parse).unwrap_or(RangeSelector::Week)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RangeSelector::Day => "24h",
            RangeSelector::Week => "7d",
            RangeSelector::Month => "30d",
        }
    }

    pub fn policy(&self) -> &'static RangePolicy {
        POLICIES
            .iter()
            .find(|p| p.selector == *self)
            .unwrap_or(&POLICIES[POLICIES.len() - 1])
    }
}

impl fmt::Display for RangeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How rows inside a window are grouped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    /// Every observation is its own bucket
    PerSample,
    /// One bucket per UTC calendar day
    PerDay,
}

impl Bucket {
    /// SQL grouping key, `None` when rows are not grouped
    pub fn group_expr(&self) -> Option<&'static str> {
        match self {
            Bucket::PerSample => None,
            Bucket::PerDay => Some("strftime('%Y-%m-%d', timestamp)"),
        }
    }
}

/// One row of the range table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangePolicy {
    pub selector: RangeSelector,
    pub window_hours: i64,
    pub bucket: Bucket,
    /// strftime pattern for bucket labels
    pub label_format: &'static str,
}

/// The time windows a query covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindows {
    /// Start of the comparison period, which ends where the current one starts
    pub previous_start: DateTime<Utc>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl RangePolicy {
    pub fn window(&self) -> TimeDelta {
        TimeDelta::hours(self.window_hours)
    }

    pub fn windows(&self, now: DateTime<Utc>) -> QueryWindows {
        let start = now - self.window();
        QueryWindows {
            previous_start: start - self.window(),
            start,
            end: now,
        }
    }
}

pub const POLICIES: [RangePolicy; 3] = [
    RangePolicy {
        selector: RangeSelector::Day,
        window_hours: 24,
        bucket: Bucket::PerSample,
        label_format: "%H:%M",
    },
    RangePolicy {
        selector: RangeSelector::Week,
        window_hours: 7 * 24,
        bucket: Bucket::PerDay,
        label_format: "%Y-%m-%d",
    },
    RangePolicy {
        selector: RangeSelector::Month,
        window_hours: 30 * 24,
        bucket: Bucket::PerDay,
        label_format: "%m-%d",
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_known_selectors() {
        assert_eq!(RangeSelector::parse("24h"), RangeSelector::Day);
        assert_eq!(RangeSelector::parse("7d"), RangeSelector::Week);
        assert_eq!(RangeSelector::parse("30d"), RangeSelector::Month);
    }

    #[test]
    fn unknown_selector_means_month() {
        assert_eq!(RangeSelector::parse("1y"), RangeSelector::Month);
        assert_eq!(RangeSelector::parse(""), RangeSelector::Month);
        assert_eq!(RangeSelector::parse("24H"), RangeSelector::Month);
    }

    #[test]
    fn missing_selector_means_week() {
        assert_eq!(RangeSelector::from_query(None), RangeSelector::Week);
        assert_eq!(RangeSelector::from_query(Some("24h")), RangeSelector::Day);
    }

    #[test]
    fn every_selector_has_a_policy() {
        for selector in [RangeSelector::Day, RangeSelector::Week, RangeSelector::Month] {
            assert_eq!(selector.policy().selector, selector);
        }
    }

    #[test]
    fn policy_table_matches_ranges() {
        let day = RangeSelector::Day.policy();
        assert_eq!(day.bucket, Bucket::PerSample);
        assert_eq!(day.label_format, "%H:%M");

        let week = RangeSelector::Week.policy();
        assert_eq!(week.bucket, Bucket::PerDay);
        assert_eq!(week.label_format, "%Y-%m-%d");

        let month = RangeSelector::Month.policy();
        assert_eq!(month.bucket, Bucket::PerDay);
        assert_eq!(month.label_format, "%m-%d");
    }

    #[test]
    fn windows_are_contiguous() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let w = RangeSelector::Week.policy().windows(now);

        assert_eq!(w.end, now);
        assert_eq!(w.start, Utc.with_ymd_and_hms(2025, 3, 3, 12, 0, 0).unwrap());
        assert_eq!(
            w.previous_start,
            Utc.with_ymd_and_hms(2025, 2, 24, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn selector_serializes_as_query_value() {
        assert_eq!(serde_json::to_string(&RangeSelector::Day).unwrap(), "\"24h\"");
        assert_eq!(RangeSelector::Month.to_string(), "30d");
    }
}
