//! Fixed-order feature rows shared by training-set preparation and inference.
//!
//! Column order: `sensor, hour, eCO2, sound, light, [roomtype], day_0 .. day_6`.
//! The day one-hot always has seven columns indexed by the store day number.

use crate::artifacts::ArtifactBundle;
use crate::days::{DayOfWeek, DAYS_PER_WEEK};
use crate::error::{ForecastError, ForecastResult};
use crate::metrics::{Metric, PerMetric};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureLayout {
    #[default]
    WithRoomtype,
    WithoutRoomtype,
}

impl FeatureLayout {
    pub fn has_roomtype(self) -> bool {
        matches!(self, FeatureLayout::WithRoomtype)
    }

    pub fn width(self) -> usize {
        self.day_offset() + DAYS_PER_WEEK as usize
    }

    pub fn metric_column(self, metric: Metric) -> usize {
        match metric {
            Metric::Eco2 => 2,
            Metric::Sound => 3,
            Metric::Light => 4,
        }
    }

    fn day_offset(self) -> usize {
        if self.has_roomtype() {
            6
        } else {
            5
        }
    }

    pub fn column_names(self) -> Vec<String> {
        let mut names: Vec<String> = ["sensor", "hour", "eCO2", "sound", "light"]
            .into_iter()
            .map(str::to_string)
            .collect();
        if self.has_roomtype() {
            names.push("roomtype".to_string());
        }
        names.extend((0..DAYS_PER_WEEK).map(|day| format!("day_{day}")));
        names
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FeatureLayout::WithRoomtype => "with_roomtype",
            FeatureLayout::WithoutRoomtype => "without_roomtype",
        }
    }
}

impl fmt::Display for FeatureLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureLayout {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "with_roomtype" | "roomtype" | "13" => Ok(FeatureLayout::WithRoomtype),
            "without_roomtype" | "no_roomtype" | "12" => Ok(FeatureLayout::WithoutRoomtype),
            other => Err(format!("unknown feature layout {other:?}")),
        }
    }
}

/// Turns one hourly observation into a normalized feature row.
#[derive(Debug, Clone, Copy)]
pub struct FeatureEncoder<'a> {
    bundle: &'a ArtifactBundle,
    layout: FeatureLayout,
}

impl<'a> FeatureEncoder<'a> {
    pub fn new(bundle: &'a ArtifactBundle, layout: FeatureLayout) -> Self {
        Self { bundle, layout }
    }

    pub fn layout(&self) -> FeatureLayout {
        self.layout
    }

    pub fn encode(
        &self,
        sensor: &str,
        roomtype: Option<&str>,
        day: DayOfWeek,
        hour: u8,
        values: &PerMetric<f64>,
    ) -> ForecastResult<Vec<f64>> {
        let sensor_id = self.bundle.sensor_encoder.transform(sensor)?;
        let stats = self.bundle.stats.slot(sensor, day, hour)?;

        let mut row = Vec::with_capacity(self.layout.width());
        row.push(sensor_id as f64);
        row.push(hour as f64);
        for metric in Metric::ALL {
            row.push(stats.get(metric).normalize(*values.get(metric)));
        }
        if self.layout.has_roomtype() {
            let roomtype = roomtype.ok_or_else(|| ForecastError::MissingRoomtype {
                sensor: sensor.to_string(),
            })?;
            row.push(self.bundle.roomtype_encoder.transform(roomtype)? as f64);
        }
        row.extend(DayOfWeek::all().map(|column| if column == day { 1.0 } else { 0.0 }));
        Ok(row)
    }
}
