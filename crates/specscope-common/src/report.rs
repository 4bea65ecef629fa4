//! Interference-rate reporting grouped by a time dimension.
//!
//! Buckets come out in a fixed order (hours ascending, Monday first,
//! January first, Morning→Night) regardless of input order. Empty buckets
//! are omitted.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::models::{Daypart, DayOfWeek, Month, Reading};

/// Dimension to group readings by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    Hour,
    DayOfWeek,
    Month,
    Daypart,
}

impl GroupKey {
    pub const ALL: [GroupKey; 4] = [
        GroupKey::Hour,
        GroupKey::DayOfWeek,
        GroupKey::Month,
        GroupKey::Daypart,
    ];

    fn slots(self) -> usize {
        match self {
            GroupKey::Hour => 24,
            GroupKey::DayOfWeek => DayOfWeek::ALL.len(),
            GroupKey::Month => Month::ALL.len(),
            GroupKey::Daypart => Daypart::ALL.len(),
        }
    }

    fn slot(self, reading: &Reading) -> usize {
        match self {
            GroupKey::Hour => reading.hour as usize,
            GroupKey::DayOfWeek => reading.day_of_week.index(),
            GroupKey::Month => reading.month.index(),
            GroupKey::Daypart => reading.daypart.index(),
        }
    }

    fn label(self, slot: usize) -> String {
        match self {
            GroupKey::Hour => slot.to_string(),
            GroupKey::DayOfWeek => DayOfWeek::ALL[slot].to_string(),
            GroupKey::Month => Month::ALL[slot].to_string(),
            GroupKey::Daypart => Daypart::ALL[slot].to_string(),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            GroupKey::Hour => "Interference % by Hour of Day",
            GroupKey::DayOfWeek => "Interference % by Day of Week",
            GroupKey::Month => "Interference % by Month",
            GroupKey::Daypart => "Interference % by Daypart",
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            GroupKey::Hour => "hour",
            GroupKey::DayOfWeek => "day_of_week",
            GroupKey::Month => "month",
            GroupKey::Daypart => "daypart",
        })
    }
}

impl FromStr for GroupKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hour" => Ok(GroupKey::Hour),
            "day" | "day_of_week" => Ok(GroupKey::DayOfWeek),
            "month" => Ok(GroupKey::Month),
            "daypart" => Ok(GroupKey::Daypart),
            other => Err(format!("unknown grouping: {other}")),
        }
    }
}

/// Per-bucket interference statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketStats {
    pub label: String,
    /// Rows in the bucket.
    pub count: usize,
    /// Rows labelled as interference.
    pub sum: usize,
    /// `100 * sum / count`.
    pub percentage: f64,
}

/// All non-empty buckets for one grouping, in canonical order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub key: GroupKey,
    pub buckets: Vec<BucketStats>,
}

impl Report {
    pub fn total_count(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum()
    }

    pub fn bucket(&self, label: &str) -> Option<&BucketStats> {
        self.buckets.iter().find(|b| b.label == label)
    }
}

/// Group `readings` by `key` and compute interference rates.
pub fn aggregate(readings: &[Reading], key: GroupKey) -> Report {
    let mut counts = vec![(0usize, 0usize); key.slots()];
    for reading in readings {
        let entry = &mut counts[key.slot(reading)];
        entry.0 += 1;
        if reading.interference {
            entry.1 += 1;
        }
    }

    let buckets = counts
        .into_iter()
        .enumerate()
        .filter(|(_, (count, _))| *count > 0)
        .map(|(slot, (count, sum))| BucketStats {
            label: key.label(slot),
            count,
            sum,
            percentage: sum as f64 / count as f64 * 100.0,
        })
        .collect();

    Report { key, buckets }
}

/// Overall interference rate in percent, `None` for an empty set.
pub fn overall_rate(readings: &[Reading]) -> Option<f64> {
    if readings.is_empty() {
        return None;
    }
    let positives = readings.iter().filter(|r| r.interference).count();
    Some(positives as f64 / readings.len() as f64 * 100.0)
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.key.title())?;
        writeln!(f, "{:<12} {:>7} {:>7} {:>9}", self.key, "count", "sum", "percent")?;
        for b in &self.buckets {
            writeln!(
                f,
                "{:<12} {:>7} {:>7} {:>8.1}%",
                b.label, b.count, b.sum, b.percentage
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::{TimestampPolicy, enrich};
    use crate::models::RawReading;

    fn reading(ts: &str, interference: bool) -> RawReading {
        RawReading {
            timestamp: Some(ts.into()),
            frequency: Some(900.0),
            power: Some(-20.0),
            latitude: Some(40.0),
            longitude: Some(-74.0),
            interference: Some(interference),
        }
    }

    fn sample() -> Vec<Reading> {
        let raw = vec![
            reading("2024-03-03T22:00:00", true),  // Sunday, March, Night
            reading("2024-01-15T08:00:00", true),  // Monday, January, Morning
            reading("2024-01-15T08:30:00", false), // Monday, January, Morning
            reading("2024-12-04T13:00:00", false), // Wednesday, December, Afternoon
            reading("2024-06-01T18:00:00", true),  // Saturday, June, Evening
        ];
        enrich(&raw, TimestampPolicy::Strict).unwrap().readings
    }

    fn labels(report: &Report) -> Vec<&str> {
        report.buckets.iter().map(|b| b.label.as_str()).collect()
    }

    #[test]
    fn hour_buckets_are_ascending() {
        let report = aggregate(&sample(), GroupKey::Hour);
        assert_eq!(labels(&report), vec!["8", "13", "18", "22"]);
        let eight = report.bucket("8").unwrap();
        assert_eq!((eight.count, eight.sum), (2, 1));
        assert!((eight.percentage - 50.0).abs() < 1e-9);
    }

    #[test]
    fn day_buckets_follow_week_order() {
        let report = aggregate(&sample(), GroupKey::DayOfWeek);
        assert_eq!(labels(&report), vec!["Monday", "Wednesday", "Saturday", "Sunday"]);
    }

    #[test]
    fn month_buckets_follow_calendar_order() {
        let report = aggregate(&sample(), GroupKey::Month);
        assert_eq!(labels(&report), vec!["January", "March", "June", "December"]);
    }

    #[test]
    fn daypart_buckets_follow_day_order() {
        let report = aggregate(&sample(), GroupKey::Daypart);
        assert_eq!(labels(&report), vec!["Morning", "Afternoon", "Evening", "Night"]);
    }

    #[test]
    fn weighted_percentages_match_overall_rate() {
        let readings = sample();
        let overall = overall_rate(&readings).unwrap();
        for key in GroupKey::ALL {
            let report = aggregate(&readings, key);
            assert_eq!(report.total_count(), readings.len());
            let weighted: f64 = report
                .buckets
                .iter()
                .map(|b| b.percentage * b.count as f64)
                .sum::<f64>()
                / report.total_count() as f64;
            assert!((weighted - overall).abs() < 1e-9, "{key}: {weighted} vs {overall}");
        }
    }

    #[test]
    fn empty_input_has_no_buckets() {
        let report = aggregate(&[], GroupKey::Hour);
        assert!(report.buckets.is_empty());
        assert_eq!(overall_rate(&[]), None);
    }

    #[test]
    fn group_key_parsing() {
        assert_eq!("day".parse::<GroupKey>().unwrap(), GroupKey::DayOfWeek);
        assert_eq!("daypart".parse::<GroupKey>().unwrap(), GroupKey::Daypart);
        assert!("week".parse::<GroupKey>().is_err());
    }

    #[test]
    fn renders_table() {
        let text = aggregate(&sample(), GroupKey::Daypart).to_string();
        assert!(text.starts_with("Interference % by Daypart"));
        assert!(text.contains("Morning"));
        assert!(text.contains("50.0%"));
    }
}
