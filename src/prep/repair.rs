use crate::days::{DayOfWeek, HOURS_PER_DAY};
use crate::error::{ForecastError, ForecastResult};
use crate::metrics::{Metric, PerMetric};
use crate::series::{SensorSeries, SeriesRow};
use crate::stats::slot_stats;

#[derive(Debug, Clone, PartialEq)]
pub struct RepairedRow {
    pub day: DayOfWeek,
    pub hour: u8,
    /// `None` when the slot had no historical average to borrow from.
    pub values: PerMetric<Option<f64>>,
    pub synthesized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotGap {
    pub day: DayOfWeek,
    pub hour: u8,
    pub metric: Metric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertedDay {
    pub day: DayOfWeek,
    /// Index in the repaired row list where the synthesized block starts.
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    pub sensor: String,
    pub roomtype: Option<String>,
    pub rows: Vec<RepairedRow>,
    pub inserted_days: Vec<InsertedDay>,
    pub gaps: Vec<SlotGap>,
}

impl RepairOutcome {
    pub fn is_complete(&self) -> bool {
        self.gaps.is_empty()
    }

    /// Converts back into a plain series. Unfilled slots are an error; the caller
    /// decides whether to drop the sensor or fill them some other way.
    pub fn into_series(self) -> ForecastResult<SensorSeries> {
        if !self.gaps.is_empty() {
            return Err(ForecastError::UnfilledSlots {
                sensor: self.sensor,
                count: self.gaps.len(),
            });
        }
        let rows = self
            .rows
            .into_iter()
            .filter_map(|row| {
                let values = row.values.try_map(|_, value| value.ok_or(())).ok()?;
                Some(SeriesRow::new(row.day, row.hour, values))
            })
            .collect();
        Ok(SensorSeries::new(self.sensor, self.roomtype, rows))
    }
}

/// Whole days skipped between two consecutive rows, walking forward around the week.
/// A Saturday -> Monday jump yields Sunday; Thursday -> Tuesday yields Fri, Sat, Sun, Mon.
pub fn missing_days(current: DayOfWeek, next: DayOfWeek) -> Vec<DayOfWeek> {
    let distance = current.forward_distance(next);
    (1..distance.max(1)).map(|offset| current.add(offset)).collect()
}

/// Fills whole-day gaps with 24 synthesized rows each, taking every value from the
/// series-wide average of the same (day, hour) slot, and rounds all values.
pub fn repair_series(series: &SensorSeries) -> RepairOutcome {
    let averages = slot_stats(&series.rows);
    let mut rows: Vec<RepairedRow> = Vec::with_capacity(series.rows.len());
    let mut inserted_days = Vec::new();
    let mut gaps = Vec::new();

    for (idx, row) in series.rows.iter().enumerate() {
        rows.push(RepairedRow {
            day: row.day,
            hour: row.hour,
            values: row.values.map(|_, value| Some(value.round())),
            synthesized: false,
        });

        let Some(next) = series.rows.get(idx + 1) else {
            continue;
        };
        for day in missing_days(row.day, next.day) {
            tracing::info!(sensor = %series.sensor, day = %day, position = rows.len(), "synthesizing missing day");
            inserted_days.push(InsertedDay {
                day,
                position: rows.len(),
            });
            for hour in 0..HOURS_PER_DAY {
                let slot = averages.get(&(day, hour));
                let values = PerMetric::from_fn(|metric| {
                    let value = slot.map(|stats| stats.get(metric).mean.round());
                    if value.is_none() {
                        gaps.push(SlotGap { day, hour, metric });
                    }
                    value
                });
                rows.push(RepairedRow {
                    day,
                    hour,
                    values,
                    synthesized: true,
                });
            }
        }
    }

    if !gaps.is_empty() {
        tracing::warn!(
            sensor = %series.sensor,
            unfilled = gaps.len(),
            "no historical average for some synthesized slots; values left empty"
        );
    }

    RepairOutcome {
        sensor: series.sensor.clone(),
        roomtype: series.roomtype.clone(),
        rows,
        inserted_days,
        gaps,
    }
}
