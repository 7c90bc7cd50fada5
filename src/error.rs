use crate::metrics::Metric;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("incomplete window for sensor {sensor}: expected {expected} hourly rows, got {got}")]
    IncompleteWindow {
        sensor: String,
        expected: usize,
        got: usize,
    },

    #[error("window for sensor {sensor} also contains rows of sensor {other}")]
    MixedSensors { sensor: String, other: String },

    #[error("no normalization statistics for sensor {sensor} day {day} hour {hour}")]
    MissingStatistics { sensor: String, day: u8, hour: u8 },

    #[error("no severity thresholds for sensor {sensor} day {day} hour {hour} metric {metric}")]
    MissingThresholds {
        sensor: String,
        day: u8,
        hour: u8,
        metric: Metric,
    },

    #[error("unknown {kind} label {value:?}; it was not part of the fitted encoding")]
    UnknownCategory { kind: &'static str, value: String },

    #[error("sensor {sensor} has no room type in the room table")]
    MissingRoomtype { sensor: String },

    #[error("day of week out of range: {0}")]
    InvalidDay(i64),

    #[error("hour out of range: {0}")]
    InvalidHour(i64),

    #[error("predictor returned shape ({rows}, {width}); expected ({expected_rows}, {expected_width})")]
    PredictionShape {
        rows: usize,
        width: usize,
        expected_rows: usize,
        expected_width: usize,
    },

    #[error("repair left {count} unfilled slots for sensor {sensor}")]
    UnfilledSlots { sensor: String, count: usize },
}

pub type ForecastResult<T> = Result<T, ForecastError>;
