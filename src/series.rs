use crate::days::DayOfWeek;
use crate::metrics::PerMetric;
use serde::{Deserialize, Serialize};

/// One hour of averaged raw readings as returned by the reading store.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyBucket {
    pub sensor: String,
    pub day: DayOfWeek,
    pub hour: u8,
    pub eco2: f64,
    pub sound: f64,
    pub color_r: f64,
    pub color_g: f64,
    pub color_b: f64,
}

impl HourlyBucket {
    pub fn light(&self) -> f64 {
        light_from_rgb(self.color_r, self.color_g, self.color_b)
    }
}

/// Hourly summary with light already derived and the room type attached.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyAggregate {
    pub sensor: String,
    pub day: DayOfWeek,
    pub hour: u8,
    pub values: PerMetric<f64>,
    pub roomtype: Option<String>,
}

impl HourlyAggregate {
    /// Count-like metrics are truncated to whole numbers, as the sensors report them.
    pub fn from_bucket(bucket: &HourlyBucket, roomtype: Option<&str>) -> Self {
        Self {
            sensor: bucket.sensor.clone(),
            day: bucket.day,
            hour: bucket.hour,
            values: PerMetric::new(
                bucket.eco2.trunc(),
                bucket.sound.trunc(),
                bucket.light().trunc(),
            ),
            roomtype: roomtype.map(str::to_string),
        }
    }
}

pub fn light_from_rgb(r: f64, g: f64, b: f64) -> f64 {
    (r + g + b) / 3.0
}

/// A row of a per-sensor historical series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRow {
    pub day: DayOfWeek,
    pub hour: u8,
    #[serde(flatten)]
    pub values: PerMetric<f64>,
}

impl SeriesRow {
    pub fn new(day: DayOfWeek, hour: u8, values: PerMetric<f64>) -> Self {
        Self { day, hour, values }
    }
}

/// Chronologically ordered hourly rows of one sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSeries {
    pub sensor: String,
    pub roomtype: Option<String>,
    pub rows: Vec<SeriesRow>,
}

impl SensorSeries {
    pub fn new(sensor: impl Into<String>, roomtype: Option<String>, rows: Vec<SeriesRow>) -> Self {
        Self {
            sensor: sensor.into(),
            roomtype,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_truncates_metrics_and_derives_light() {
        let bucket = HourlyBucket {
            sensor: "thingy001".to_string(),
            day: DayOfWeek::from_store(2).unwrap(),
            hour: 9,
            eco2: 612.8,
            sound: 41.9,
            color_r: 10.0,
            color_g: 20.0,
            color_b: 32.0,
        };
        let aggregate = HourlyAggregate::from_bucket(&bucket, Some("Office"));
        assert_eq!(aggregate.values, PerMetric::new(612.0, 41.0, 20.0));
        assert_eq!(aggregate.roomtype.as_deref(), Some("Office"));
    }
}
