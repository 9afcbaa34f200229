//! Weather Series
//!
//! A time-indexed table of environmental variables with windowed
//! feasibility queries used by install phases to model weather delays.
//!
//! Each record covers the interval from its timestamp until the next
//! record or until `timestamp + resolution`, whichever comes first. Time
//! not covered by any record is a gap and is never considered workable.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use chrono::{Duration, NaiveDate};
//! use orbiter::weather::{WeatherRecord, WeatherSeries};
//!
//! let start = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let records = (0..24)
//!     .map(|h| WeatherRecord::new(start + Duration::hours(h)).with("windspeed", if h < 6 { 20.0 } else { 8.0 }))
//!     .collect();
//! let weather = WeatherSeries::new(records).unwrap();
//!
//! let limits = BTreeMap::from([("windspeed".to_string(), 15.0)]);
//! let window = weather.next_feasible_window(start, Duration::hours(4), &limits);
//! assert_eq!(window, Some(start + Duration::hours(6)));
//! ```

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::WeatherError;

/// Variable name -> maximum allowed value.
pub type Thresholds = BTreeMap<String, f64>;

/// Resolution assumed for a series with fewer than two records.
const DEFAULT_RESOLUTION_MINUTES: i64 = 60;

/// A single observation of environmental variables.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WeatherRecord {
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub values: BTreeMap<String, f64>,
}

impl WeatherRecord {
    pub fn new(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            values: BTreeMap::new(),
        }
    }

    /// Adds a variable observation.
    pub fn with(mut self, variable: impl Into<String>, value: f64) -> Self {
        self.values.insert(variable.into(), value);
        self
    }

    /// Returns true if every thresholded variable is present, finite and
    /// within its limit.
    pub fn satisfies(&self, thresholds: &Thresholds) -> bool {
        thresholds.iter().all(|(variable, max)| {
            self.values
                .get(variable)
                .is_some_and(|value| value.is_finite() && value <= max)
        })
    }
}

/// An operation placed into the weather series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Time spent waiting for weather before `start`
    pub delay: Duration,
}

#[derive(Deserialize)]
struct RawWeatherSeries {
    records: Vec<WeatherRecord>,
    #[serde(default)]
    resolution_minutes: Option<i64>,
}

/// Ordered, read-only weather table.
///
/// Timestamps are strictly increasing. Construct with
/// [`WeatherSeries::new`] or deserialize from a mapping with `records` and an
/// optional `resolution_minutes`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "RawWeatherSeries")]
pub struct WeatherSeries {
    records: Vec<WeatherRecord>,
    #[serde(rename = "resolution_minutes", serialize_with = "serialize_minutes")]
    resolution: Duration,
}

fn serialize_minutes<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(d.num_minutes())
}

impl TryFrom<RawWeatherSeries> for WeatherSeries {
    type Error = WeatherError;

    fn try_from(raw: RawWeatherSeries) -> Result<Self, Self::Error> {
        match raw.resolution_minutes {
            Some(minutes) => {
                let resolution =
                    Duration::try_minutes(minutes).ok_or(WeatherError::InvalidResolution)?;
                Self::with_resolution(raw.records, resolution)
            }
            None => Self::new(raw.records),
        }
    }
}

impl WeatherSeries {
    /// Builds a series, inferring the resolution from the smallest spacing
    /// between records (one hour for fewer than two records).
    pub fn new(records: Vec<WeatherRecord>) -> Result<Self, WeatherError> {
        check_order(&records)?;

        let resolution = records
            .windows(2)
            .map(|pair| pair[1].timestamp - pair[0].timestamp)
            .min()
            .unwrap_or_else(|| Duration::minutes(DEFAULT_RESOLUTION_MINUTES));

        Ok(Self {
            records,
            resolution,
        })
    }

    /// Builds a series with an explicit per-record coverage length.
    pub fn with_resolution(
        records: Vec<WeatherRecord>,
        resolution: Duration,
    ) -> Result<Self, WeatherError> {
        if resolution <= Duration::zero() {
            return Err(WeatherError::InvalidResolution);
        }
        check_order(&records)?;

        Ok(Self {
            records,
            resolution,
        })
    }

    pub fn records(&self) -> &[WeatherRecord] {
        &self.records
    }

    pub fn resolution(&self) -> Duration {
        self.resolution
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Timestamp of the first record.
    pub fn start(&self) -> Option<NaiveDateTime> {
        self.records.first().map(|r| r.timestamp)
    }

    /// End of the last record's coverage.
    pub fn end(&self) -> Option<NaiveDateTime> {
        self.records.last().map(|r| self.extend(r.timestamp))
    }

    /// `timestamp + resolution`, saturating at the end of representable time.
    fn extend(&self, timestamp: NaiveDateTime) -> NaiveDateTime {
        timestamp
            .checked_add_signed(self.resolution)
            .unwrap_or(NaiveDateTime::MAX)
    }

    /// Names of all variables observed in the series.
    pub fn variables(&self) -> BTreeSet<&str> {
        self.records
            .iter()
            .flat_map(|r| r.values.keys().map(String::as_str))
            .collect()
    }

    /// End of the interval covered by record `index`.
    fn coverage_end(&self, index: usize) -> NaiveDateTime {
        let own_end = self.extend(self.records[index].timestamp);
        match self.records.get(index + 1) {
            Some(next) if next.timestamp < own_end => next.timestamp,
            _ => own_end,
        }
    }

    /// Returns true iff `[start, start + duration)` is fully covered by
    /// records that all satisfy `thresholds`.
    ///
    /// A zero-length window is feasible when the record covering `start`
    /// satisfies the thresholds. Negative durations, and windows ending
    /// beyond representable time, are never feasible.
    pub fn window_is_feasible(
        &self,
        start: NaiveDateTime,
        duration: Duration,
        thresholds: &Thresholds,
    ) -> bool {
        if duration < Duration::zero() {
            return false;
        }

        // Record whose coverage may contain `start`
        let Some(first) = self
            .records
            .partition_point(|r| r.timestamp <= start)
            .checked_sub(1)
        else {
            return false;
        };

        let Some(end) = start.checked_add_signed(duration) else {
            return false;
        };
        let mut cursor = start;

        for index in first..self.records.len() {
            let record = &self.records[index];
            if record.timestamp > cursor {
                return false;
            }

            let covered_until = self.coverage_end(index);
            if covered_until <= cursor {
                return false;
            }

            if !record.satisfies(thresholds) {
                return false;
            }

            cursor = covered_until;
            if cursor >= end {
                return true;
            }
        }

        false
    }

    /// Returns the first start at or after `earliest_start` for which
    /// [`window_is_feasible`](Self::window_is_feasible) holds.
    ///
    /// Candidates are `earliest_start` itself followed by every later record
    /// timestamp, in series order. Returns `None` when no candidate works.
    pub fn next_feasible_window(
        &self,
        earliest_start: NaiveDateTime,
        duration: Duration,
        thresholds: &Thresholds,
    ) -> Option<NaiveDateTime> {
        if self.window_is_feasible(earliest_start, duration, thresholds) {
            return Some(earliest_start);
        }

        let from = self.records.partition_point(|r| r.timestamp <= earliest_start);
        self.records[from..]
            .iter()
            .map(|r| r.timestamp)
            .find(|&candidate| self.window_is_feasible(candidate, duration, thresholds))
    }

    /// Places an operation of `duration` at the first feasible window at or
    /// after `earliest_start`.
    pub fn schedule(
        &self,
        earliest_start: NaiveDateTime,
        duration: Duration,
        thresholds: &Thresholds,
    ) -> Option<OperationWindow> {
        let start = self.next_feasible_window(earliest_start, duration, thresholds)?;
        Some(OperationWindow {
            start,
            end: start.checked_add_signed(duration)?,
            delay: start - earliest_start,
        })
    }
}

fn check_order(records: &[WeatherRecord]) -> Result<(), WeatherError> {
    for (index, pair) in records.windows(2).enumerate() {
        let (previous, current) = (pair[0].timestamp, pair[1].timestamp);
        if current == previous {
            return Err(WeatherError::DuplicateTimestamp(current));
        }
        if current < previous {
            return Err(WeatherError::Unordered {
                index: index + 1,
                previous,
                current,
            });
        }
    }
    Ok(())
}

/// Converts fractional hours into a [`Duration`] at second precision.
///
/// Returns `None` for non-finite values or values outside the range
/// [`Duration`] can represent.
pub fn hours(value: f64) -> Option<Duration> {
    let seconds = (value * 3600.0).round();
    if !seconds.is_finite() || seconds.abs() >= i64::MAX as f64 {
        return None;
    }
    Duration::try_seconds(seconds as i64)
}

/// Converts a [`Duration`] into fractional hours.
pub fn to_hours(duration: Duration) -> f64 {
    duration.num_seconds() as f64 / 3600.0
}
