//! Data model for RF spectrum readings.
//!
//! A [`RawReading`] is one row as it arrives from a CSV file, a JSON array,
//! or the simulator. The enricher turns it into a [`Reading`], which carries
//! the derived calendar and band features. Readings are never mutated once
//! they reach reporting or the classifier; labelling produces new values.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ── Band ────────────────────────────────────────────────────────────

/// Lower edge of the 2.4 GHz Wi-Fi band, MHz.
pub const WIFI_BAND_START_MHZ: f64 = 2400.0;
/// Upper edge of the 2.4 GHz Wi-Fi band, MHz.
pub const WIFI_BAND_END_MHZ: f64 = 2485.0;

/// A contiguous frequency range in MHz, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub start_mhz: f64,
    pub end_mhz: f64,
}

impl Band {
    pub const WIFI_2G4: Band = Band {
        start_mhz: WIFI_BAND_START_MHZ,
        end_mhz: WIFI_BAND_END_MHZ,
    };

    pub fn new(start_mhz: f64, end_mhz: f64) -> Self {
        Self { start_mhz, end_mhz }
    }

    pub fn contains(&self, frequency_mhz: f64) -> bool {
        self.start_mhz <= frequency_mhz && frequency_mhz <= self.end_mhz
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} MHz", self.start_mhz, self.end_mhz)
    }
}

// ── Raw reading ─────────────────────────────────────────────────────

/// One unparsed spectrum sample.
///
/// Only `timestamp` is needed by the enricher; the numeric fields are
/// optional here and required by whichever consumer uses them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    #[serde(default)]
    pub timestamp: Option<String>,
    /// MHz.
    #[serde(default)]
    pub frequency: Option<f64>,
    /// dBm.
    #[serde(default)]
    pub power: Option<f64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(
        default,
        deserialize_with = "deserialize_flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub interference: Option<bool>,
}

/// Parse a 0/1 style flag as found in CSV cells.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" => Some(true),
        "0" | "0.0" | "false" => Some(false),
        _ => None,
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Float(f64),
        Text(String),
    }

    match Option::<Flag>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Flag::Bool(b)) => Ok(Some(b)),
        Some(Flag::Int(i)) => Ok(Some(i != 0)),
        Some(Flag::Float(f)) => Ok(Some(f != 0.0)),
        Some(Flag::Text(s)) => parse_flag(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid interference flag: {s}"))),
    }
}

fn serialize_flag<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}

// ── Calendar features ───────────────────────────────────────────────

/// Day of the week, Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    /// Canonical reporting order.
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        }
    }
}

impl From<chrono::Weekday> for DayOfWeek {
    fn from(day: chrono::Weekday) -> Self {
        DayOfWeek::ALL[day.num_days_from_monday() as usize]
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Calendar month, January first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    /// Canonical reporting order.
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Month from its 1-based calendar number.
    pub fn from_number(number: u32) -> Option<Self> {
        Month::ALL.get(number.checked_sub(1)? as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Month::January => "January",
            Month::February => "February",
            Month::March => "March",
            Month::April => "April",
            Month::May => "May",
            Month::June => "June",
            Month::July => "July",
            Month::August => "August",
            Month::September => "September",
            Month::October => "October",
            Month::November => "November",
            Month::December => "December",
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Coarse time-of-day bucket used by trend reporting.
///
/// | Hours     | Daypart   |
/// |-----------|-----------|
/// | 5 – 11    | Morning   |
/// | 12 – 16   | Afternoon |
/// | 17 – 20   | Evening   |
/// | otherwise | Night     |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Daypart {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl Daypart {
    pub const ALL: [Daypart; 4] = [
        Daypart::Morning,
        Daypart::Afternoon,
        Daypart::Evening,
        Daypart::Night,
    ];

    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => Daypart::Morning,
            12..=16 => Daypart::Afternoon,
            17..=20 => Daypart::Evening,
            _ => Daypart::Night,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Daypart::Morning => "Morning",
            Daypart::Afternoon => "Afternoon",
            Daypart::Evening => "Evening",
            Daypart::Night => "Night",
        }
    }
}

impl fmt::Display for Daypart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Time-of-day bucket used when building training sets. Boundaries are
/// 6/12/18/24, unlike [`Daypart`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePeriod {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimePeriod {
    pub const ALL: [TimePeriod; 4] = [
        TimePeriod::Morning,
        TimePeriod::Afternoon,
        TimePeriod::Evening,
        TimePeriod::Night,
    ];

    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => TimePeriod::Morning,
            12..=17 => TimePeriod::Afternoon,
            18..=23 => TimePeriod::Evening,
            _ => TimePeriod::Night,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TimePeriod::Morning => "morning",
            TimePeriod::Afternoon => "afternoon",
            TimePeriod::Evening => "evening",
            TimePeriod::Night => "night",
        }
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

// ── Enriched reading ────────────────────────────────────────────────

/// A spectrum sample with its derived features.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    /// Wall-clock time of the sample in the offset it was recorded with.
    pub timestamp: NaiveDateTime,
    pub frequency: Option<f64>,
    pub power: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub hour: u32,
    pub day_of_week: DayOfWeek,
    pub month: Month,
    pub daypart: Daypart,
    pub time_period: TimePeriod,
    #[serde(serialize_with = "serialize_flag")]
    pub wifi_proximity: bool,
    #[serde(serialize_with = "serialize_flag")]
    pub interference: bool,
}

impl Reading {
    /// Ordered classifier input, if every feature is present.
    pub fn feature_vector(&self) -> Option<FeatureVector> {
        Some(FeatureVector {
            frequency: self.frequency?,
            power: self.power?,
            latitude: self.latitude?,
            longitude: self.longitude?,
            hour: i64::from(self.hour),
        })
    }

    /// Copy of this reading carrying a new interference label.
    pub fn with_interference(&self, interference: bool) -> Reading {
        Reading {
            interference,
            ..self.clone()
        }
    }
}

// ── Classifier I/O ──────────────────────────────────────────────────

/// Number of classifier input features.
pub const N_FEATURES: usize = 5;

/// Feature names in classifier input order.
pub const FEATURE_NAMES: [&str; N_FEATURES] =
    ["frequency", "power", "latitude", "longitude", "hour"];

/// Single-reading classifier input: `[frequency, power, latitude, longitude, hour]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub frequency: f64,
    pub power: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub hour: i64,
}

impl FeatureVector {
    pub fn to_array(&self) -> [f64; N_FEATURES] {
        [
            self.frequency,
            self.power,
            self.latitude,
            self.longitude,
            self.hour as f64,
        ]
    }
}

/// Classifier output for one reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub interference: bool,
    /// Positive-class probability rounded to two decimals.
    pub confidence: f64,
}
