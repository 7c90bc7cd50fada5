use crate::artifacts::ArtifactBundle;
use crate::days::DayOfWeek;
use crate::error::{ForecastError, ForecastResult};
use crate::features::{FeatureEncoder, FeatureLayout};
use crate::series::HourlyAggregate;

/// Number of hourly rows the models consume.
pub const WINDOW_ROWS: usize = 6;

/// A `(WINDOW_ROWS, layout.width())` feature matrix for one sensor, plus the
/// slot of its newest row, which anchors the forecast targets.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowTensor {
    pub sensor: String,
    pub layout: FeatureLayout,
    pub rows: Vec<Vec<f64>>,
    pub last_day: DayOfWeek,
    pub last_hour: u8,
}

impl WindowTensor {
    pub fn width(&self) -> usize {
        self.layout.width()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WindowBuilder<'a> {
    encoder: FeatureEncoder<'a>,
}

impl<'a> WindowBuilder<'a> {
    pub fn new(bundle: &'a ArtifactBundle, layout: FeatureLayout) -> Self {
        Self {
            encoder: FeatureEncoder::new(bundle, layout),
        }
    }

    /// Encodes exactly six chronologically ordered aggregates of one sensor.
    /// Any other row count is an incomplete window; rows of a second sensor
    /// are rejected.
    pub fn build(&self, aggregates: &[HourlyAggregate]) -> ForecastResult<WindowTensor> {
        let sensor = aggregates.first().map(|row| row.sensor.clone()).unwrap_or_default();
        if aggregates.len() != WINDOW_ROWS {
            return Err(ForecastError::IncompleteWindow {
                sensor,
                expected: WINDOW_ROWS,
                got: aggregates.len(),
            });
        }
        if let Some(row) = aggregates.iter().find(|row| row.sensor != sensor) {
            return Err(ForecastError::MixedSensors {
                sensor,
                other: row.sensor.clone(),
            });
        }

        let rows = aggregates
            .iter()
            .map(|row| {
                self.encoder
                    .encode(&row.sensor, row.roomtype.as_deref(), row.day, row.hour, &row.values)
            })
            .collect::<ForecastResult<Vec<_>>>()?;

        let last = &aggregates[WINDOW_ROWS - 1];
        Ok(WindowTensor {
            sensor,
            layout: self.encoder.layout(),
            rows,
            last_day: last.day,
            last_hour: last.hour,
        })
    }
}
