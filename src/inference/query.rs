use super::window::WINDOW_ROWS;
use crate::days::{DayOfWeek, HOURS_PER_DAY};
use crate::series::HourlyBucket;
use chrono::{DateTime, Datelike, Duration, DurationRound, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which readings feed the window.
///
/// `Hist` uses the six whole hours before the current hour. `Live` also takes
/// the readings of the running hour and folds them into the last whole hour, so
/// the newest data contributes without creating a seventh bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowMode {
    #[default]
    Hist,
    Live,
}

impl FromStr for WindowMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hist" | "historical" => Ok(WindowMode::Hist),
            "live" => Ok(WindowMode::Live),
            other => Err(format!("unknown window mode {other:?}")),
        }
    }
}

impl fmt::Display for WindowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WindowMode::Hist => "hist",
            WindowMode::Live => "live",
        })
    }
}

/// Reading time range for one cycle. Readings at or after `fold_from` are
/// grouped into the bucket starting at `fold_from`. `start_hour` is the
/// wall-clock hour of `start` in the cycle's time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub mode: WindowMode,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub fold_from: DateTime<Utc>,
    pub start_hour: u8,
}

impl QueryWindow {
    /// `current = now - 1h`; the window starts six hours before the top of
    /// `current`'s hour. Hours are floored in UTC, matching the store's
    /// bucketing, so zones with a sub-hour offset keep whole buckets.
    pub fn at<Tz: TimeZone>(now: &DateTime<Tz>, mode: WindowMode) -> Self {
        let current = (now.clone() - Duration::hours(1)).with_timezone(&Utc);
        let current_hour = floor_hour(&current);
        let start = current_hour - Duration::hours(WINDOW_ROWS as i64);
        let end = match mode {
            WindowMode::Hist => current_hour,
            WindowMode::Live => current,
        };
        Self {
            mode,
            start_hour: start.with_timezone(&now.timezone()).hour() as u8,
            start,
            end,
            fold_from: current_hour - Duration::hours(1),
        }
    }
}

pub fn floor_hour<Tz: TimeZone>(ts: &DateTime<Tz>) -> DateTime<Tz> {
    ts.clone()
        .duration_trunc(Duration::hours(1))
        .unwrap_or_else(|_| ts.clone())
}

/// One hourly average as the reading store returns it, keyed by bucket start.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketReading {
    pub sensor: String,
    pub bucket_start: DateTime<Utc>,
    pub eco2: f64,
    pub sound: f64,
    pub color_r: f64,
    pub color_g: f64,
    pub color_b: f64,
}

impl BucketReading {
    /// Day and hour of the bucket start on the wall clock of `tz`.
    pub fn in_zone<Tz: TimeZone>(&self, tz: &Tz) -> HourlyBucket {
        let local = self.bucket_start.with_timezone(tz);
        HourlyBucket {
            sensor: self.sensor.clone(),
            day: DayOfWeek::from_weekday(local.weekday()),
            hour: local.hour() as u8,
            eco2: self.eco2,
            sound: self.sound,
            color_r: self.color_r,
            color_g: self.color_g,
            color_b: self.color_b,
        }
    }
}

/// Orders one sensor's buckets for the window and relabels each by its end.
///
/// Buckets are keyed by the hour they start in; hours earlier than the
/// window's start hour belong to the next day and sort after the later hours.
/// The label then moves to the end of the bucket: hour 23 becomes hour 0 of the
/// following day.
pub fn order_buckets(start_hour: u8, mut buckets: Vec<HourlyBucket>) -> Vec<HourlyBucket> {
    buckets.sort_by_key(|bucket| (bucket.hour < start_hour, bucket.hour));
    for bucket in &mut buckets {
        if bucket.hour == HOURS_PER_DAY - 1 {
            bucket.day = bucket.day.next();
        }
        bucket.hour = (bucket.hour + 1) % HOURS_PER_DAY;
    }
    buckets
}
