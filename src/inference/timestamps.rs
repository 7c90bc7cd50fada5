use crate::days::DayOfWeek;
use crate::error::{ForecastError, ForecastResult};
use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Places a (day, hour) label in the calendar week of `now`.
///
/// The date moves by the calendar-index difference between today and the
/// target day, so targets are always resolved within the Monday-based week
/// containing `now`. Minutes and seconds are zero.
pub fn prediction_timestamp(now: NaiveDateTime, day: DayOfWeek, hour: u8) -> ForecastResult<NaiveDateTime> {
    let today = i64::from(now.weekday().num_days_from_monday());
    let target = i64::from(day.calendar_index());
    let date = now.date() - Duration::days(today - target);
    let time = NaiveTime::from_hms_opt(u32::from(hour), 0, 0).ok_or(ForecastError::InvalidHour(i64::from(hour)))?;
    Ok(date.and_time(time))
}

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}
