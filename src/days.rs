//! Day-of-week conventions.
//!
//! Three numberings meet in this crate:
//!
//! * the store convention used by readings, statistics and one-hot columns:
//!   Sunday = 0 .. Saturday = 6 (Postgres `EXTRACT(DOW ...)`);
//! * the calendar convention used for dates: Monday = 0 .. Sunday = 6
//!   (`chrono::Weekday::num_days_from_monday`);
//! * one-hot column `day_k`, where `k` is the store index.
//!
//! All conversions go through the two tables below.

use crate::error::{ForecastError, ForecastResult};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;

const STORE_TO_CALENDAR: [u8; 7] = [6, 0, 1, 2, 3, 4, 5];
const CALENDAR_TO_STORE: [u8; 7] = [1, 2, 3, 4, 5, 6, 0];

pub const DAYS_PER_WEEK: u8 = 7;
pub const HOURS_PER_DAY: u8 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DayOfWeek(u8);

impl DayOfWeek {
    pub const SUNDAY: DayOfWeek = DayOfWeek(0);

    pub fn from_store(index: i64) -> ForecastResult<Self> {
        if (0..DAYS_PER_WEEK as i64).contains(&index) {
            Ok(Self(index as u8))
        } else {
            Err(ForecastError::InvalidDay(index))
        }
    }

    pub fn from_weekday(weekday: Weekday) -> Self {
        Self(CALENDAR_TO_STORE[weekday.num_days_from_monday() as usize])
    }

    pub fn store_index(self) -> u8 {
        self.0
    }

    pub fn calendar_index(self) -> u8 {
        STORE_TO_CALENDAR[self.0 as usize]
    }

    pub fn one_hot_column(self) -> usize {
        self.0 as usize
    }

    pub fn next(self) -> Self {
        self.add(1)
    }

    pub fn add(self, days: u8) -> Self {
        Self((self.0 + days % DAYS_PER_WEEK) % DAYS_PER_WEEK)
    }

    /// Circular forward distance from `self` to `other`, in `0..7`.
    pub fn forward_distance(self, other: DayOfWeek) -> u8 {
        (other.0 as i16 - self.0 as i16).rem_euclid(DAYS_PER_WEEK as i16) as u8
    }

    pub fn all() -> impl Iterator<Item = DayOfWeek> {
        (0..DAYS_PER_WEEK).map(DayOfWeek)
    }
}

impl TryFrom<u8> for DayOfWeek {
    type Error = ForecastError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_store(value as i64)
    }
}

impl From<DayOfWeek> for u8 {
    fn from(day: DayOfWeek) -> u8 {
        day.0
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn validate_hour(hour: i64) -> ForecastResult<u8> {
    if (0..HOURS_PER_DAY as i64).contains(&hour) {
        Ok(hour as u8)
    } else {
        Err(ForecastError::InvalidHour(hour))
    }
}
