//! Feature enrichment: timestamp parsing and derived calendar/band features.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::error::{Result, SpecscopeError};
use crate::models::{Band, Daypart, DayOfWeek, Month, RawReading, Reading, TimePeriod};

/// What to do with a row whose timestamp is missing or unparseable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampPolicy {
    /// Fail the whole batch (trend analysis).
    Strict,
    /// Drop the row and count it (replay, monitoring).
    DropInvalid,
}

/// Result of enriching a batch.
#[derive(Debug, Clone, Default)]
pub struct Enriched {
    pub readings: Vec<Reading>,
    /// Indices (0-based, input order) of rows that were dropped.
    pub dropped: Vec<usize>,
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a timestamp into its wall-clock instant.
///
/// Offset-qualified values keep the hour of their own offset.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.naive_local());
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// `true` when the frequency falls in the 2.4 GHz Wi-Fi band.
pub fn wifi_proximity(frequency_mhz: f64) -> bool {
    Band::WIFI_2G4.contains(frequency_mhz)
}

/// Derive every feature of a reading from its instant and raw fields.
pub fn enrich_one(timestamp: NaiveDateTime, raw: &RawReading) -> Reading {
    let hour = timestamp.hour();
    // Month numbers from chrono are always 1..=12.
    let month = Month::from_number(timestamp.month()).unwrap_or(Month::January);
    Reading {
        timestamp,
        frequency: raw.frequency,
        power: raw.power,
        latitude: raw.latitude,
        longitude: raw.longitude,
        hour,
        day_of_week: DayOfWeek::from(timestamp.weekday()),
        month,
        daypart: Daypart::from_hour(hour),
        time_period: TimePeriod::from_hour(hour),
        wifi_proximity: raw.frequency.is_some_and(wifi_proximity),
        interference: raw.interference.unwrap_or(false),
    }
}

/// Enrich a batch of raw readings in one pass.
///
/// The input is left untouched. A missing interference value defaults to 0.
pub fn enrich(raw: &[RawReading], policy: TimestampPolicy) -> Result<Enriched> {
    let mut out = Enriched {
        readings: Vec::with_capacity(raw.len()),
        dropped: Vec::new(),
    };

    for (idx, row) in raw.iter().enumerate() {
        match row.timestamp.as_deref().and_then(parse_timestamp) {
            Some(ts) => out.readings.push(enrich_one(ts, row)),
            None => match policy {
                TimestampPolicy::Strict => {
                    return Err(SpecscopeError::InvalidTimestamp {
                        row: idx + 1,
                        value: row.timestamp.clone().unwrap_or_default(),
                    });
                }
                TimestampPolicy::DropInvalid => out.dropped.push(idx),
            },
        }
    }

    if !out.dropped.is_empty() {
        tracing::debug!(
            dropped = out.dropped.len(),
            kept = out.readings.len(),
            "dropped rows with unparseable timestamps"
        );
    }

    Ok(out)
}

/// Recompute derived features of already-enriched readings.
///
/// Derived values depend only on `timestamp` and `frequency`, so this is
/// idempotent.
pub fn reenrich(readings: &[Reading]) -> Vec<Reading> {
    readings
        .iter()
        .map(|r| {
            let raw = RawReading {
                timestamp: None,
                frequency: r.frequency,
                power: r.power,
                latitude: r.latitude,
                longitude: r.longitude,
                interference: Some(r.interference),
            };
            enrich_one(r.timestamp, &raw)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(ts: &str, freq: f64) -> RawReading {
        RawReading {
            timestamp: Some(ts.into()),
            frequency: Some(freq),
            power: Some(-20.0),
            latitude: Some(40.0),
            longitude: Some(-74.0),
            interference: None,
        }
    }

    #[test]
    fn parses_common_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-01-15T08:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15 08:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T08:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T08:00:00-07:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15 08:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-01-15").map(|t| t.hour()),
            Some(0)
        );
        assert!(parse_timestamp("2024-01-15T08:00:00.123456789+02:00").is_some());
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("not a date"), None);
        assert_eq!(parse_timestamp("2024-13-40T99:00:00"), None);
    }

    #[test]
    fn derives_calendar_features() {
        // 2024-01-15 was a Monday.
        let out = enrich(&[raw("2024-01-15T08:00:00", 2450.0)], TimestampPolicy::Strict).unwrap();
        let r = &out.readings[0];
        assert_eq!(r.hour, 8);
        assert_eq!(r.day_of_week, DayOfWeek::Monday);
        assert_eq!(r.month, Month::January);
        assert_eq!(r.daypart, Daypart::Morning);
        assert_eq!(r.time_period, TimePeriod::Morning);
        assert!(r.wifi_proximity);
        assert!(!r.interference);
    }

    #[test]
    fn wifi_proximity_is_inclusive() {
        assert!(wifi_proximity(2400.0));
        assert!(wifi_proximity(2485.0));
        assert!(!wifi_proximity(2399.9));
        assert!(!wifi_proximity(2485.1));
        assert!(!wifi_proximity(900.0));
    }

    #[test]
    fn strict_policy_fails_whole_batch() {
        let rows = vec![raw("2024-01-15T08:00:00", 900.0), raw("garbage", 900.0)];
        let err = enrich(&rows, TimestampPolicy::Strict).unwrap_err();
        assert!(matches!(err, SpecscopeError::InvalidTimestamp { row: 2, .. }));
    }

    #[test]
    fn strict_policy_fails_on_missing_timestamp() {
        let mut row = raw("2024-01-15T08:00:00", 900.0);
        row.timestamp = None;
        assert!(enrich(&[row], TimestampPolicy::Strict).is_err());
    }

    #[test]
    fn drop_policy_skips_bad_rows() {
        let rows = vec![
            raw("garbage", 900.0),
            raw("2024-01-15T08:00:00", 900.0),
            raw("", 900.0),
        ];
        let out = enrich(&rows, TimestampPolicy::DropInvalid).unwrap();
        assert_eq!(out.readings.len(), 1);
        assert_eq!(out.dropped, vec![0, 2]);
        // input is untouched
        assert_eq!(rows[0].timestamp.as_deref(), Some("garbage"));
    }

    #[test]
    fn existing_interference_is_kept() {
        let mut row = raw("2024-01-15T08:00:00", 900.0);
        row.interference = Some(true);
        let out = enrich(&[row], TimestampPolicy::Strict).unwrap();
        assert!(out.readings[0].interference);
    }

    #[test]
    fn enrichment_is_idempotent() {
        let rows = vec![
            raw("2024-03-02T04:59:59", 2400.0),
            raw("2024-07-19T21:00:00", 2485.0),
            raw("2024-12-31T23:30:00", 88.0),
        ];
        let once = enrich(&rows, TimestampPolicy::Strict).unwrap().readings;
        let twice = reenrich(&once);
        assert_eq!(once, twice);
    }
}
