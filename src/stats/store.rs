use super::{severity_cutoffs, slot_samples, GroupStats};
use crate::days::DayOfWeek;
use crate::error::{ForecastError, ForecastResult};
use crate::metrics::{Metric, PerMetric};
use crate::series::SensorSeries;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

type SlotTable<T> = BTreeMap<DayOfWeek, BTreeMap<u8, T>>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub medium: f64,
    pub high: f64,
}

/// sensor -> day -> hour -> per-metric mean/std.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizationParams {
    sensors: BTreeMap<String, SlotTable<PerMetric<GroupStats>>>,
}

impl NormalizationParams {
    pub fn insert(&mut self, sensor: &str, day: DayOfWeek, hour: u8, stats: PerMetric<GroupStats>) {
        self.sensors
            .entry(sensor.to_string())
            .or_default()
            .entry(day)
            .or_default()
            .insert(hour, stats);
    }

    pub fn entry(&self, sensor: &str, day: DayOfWeek, hour: u8) -> ForecastResult<&PerMetric<GroupStats>> {
        self.sensors
            .get(sensor)
            .and_then(|days| days.get(&day))
            .and_then(|hours| hours.get(&hour))
            .ok_or_else(|| ForecastError::MissingStatistics {
                sensor: sensor.to_string(),
                day: day.store_index(),
                hour,
            })
    }

    pub fn sensors(&self) -> impl Iterator<Item = &str> {
        self.sensors.keys().map(String::as_str)
    }

    pub fn slot_count(&self) -> usize {
        self.sensors
            .values()
            .flat_map(|days| days.values())
            .map(|hours| hours.len())
            .sum()
    }
}

/// sensor -> day -> hour -> per-metric medium/high cutoffs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeverityThresholds {
    sensors: BTreeMap<String, SlotTable<PerMetric<Thresholds>>>,
}

impl SeverityThresholds {
    pub fn insert(&mut self, sensor: &str, day: DayOfWeek, hour: u8, cutoffs: PerMetric<Thresholds>) {
        self.sensors
            .entry(sensor.to_string())
            .or_default()
            .entry(day)
            .or_default()
            .insert(hour, cutoffs);
    }

    pub fn get(&self, sensor: &str, day: DayOfWeek, hour: u8, metric: Metric) -> ForecastResult<Thresholds> {
        self.sensors
            .get(sensor)
            .and_then(|days| days.get(&day))
            .and_then(|hours| hours.get(&hour))
            .map(|cutoffs| *cutoffs.get(metric))
            .ok_or_else(|| ForecastError::MissingThresholds {
                sensor: sensor.to_string(),
                day: day.store_index(),
                hour,
                metric,
            })
    }
}

/// Per-slot normalization statistics and severity cutoffs for every trained sensor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticsStore {
    pub normalization: NormalizationParams,
    pub thresholds: SeverityThresholds,
}

impl StatisticsStore {
    pub fn new(normalization: NormalizationParams, thresholds: SeverityThresholds) -> Self {
        Self {
            normalization,
            thresholds,
        }
    }

    pub fn build<'a>(series: impl IntoIterator<Item = &'a SensorSeries>) -> Self {
        let mut store = Self::default();
        for sensor_series in series {
            store.add_sensor(sensor_series);
        }
        store
    }

    /// Groups the sensor's rows by (day, hour) and records mean/std and k-means
    /// cutoffs for each metric of every group.
    pub fn add_sensor(&mut self, series: &SensorSeries) {
        for ((day, hour), samples) in slot_samples(&series.rows) {
            let stats = samples.clone().try_map(|_, values| GroupStats::from_samples(&values).ok_or(()));
            let cutoffs = samples.try_map(|_, values| severity_cutoffs(&values).ok_or(()));
            match (stats, cutoffs) {
                (Ok(stats), Ok(cutoffs)) => {
                    self.normalization.insert(&series.sensor, day, hour, stats);
                    self.thresholds.insert(&series.sensor, day, hour, cutoffs);
                }
                _ => {
                    tracing::warn!(
                        sensor = %series.sensor,
                        day = %day,
                        hour,
                        "slot has no finite samples; no statistics recorded"
                    );
                }
            }
        }
    }

    pub fn lookup(&self, sensor: &str, day: DayOfWeek, hour: u8, metric: Metric) -> ForecastResult<GroupStats> {
        self.normalization
            .entry(sensor, day, hour)
            .map(|stats| *stats.get(metric))
    }

    pub fn slot(&self, sensor: &str, day: DayOfWeek, hour: u8) -> ForecastResult<&PerMetric<GroupStats>> {
        self.normalization.entry(sensor, day, hour)
    }

    pub fn thresholds(&self, sensor: &str, day: DayOfWeek, hour: u8, metric: Metric) -> ForecastResult<Thresholds> {
        self.thresholds.get(sensor, day, hour, metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::SeriesRow;

    fn day(index: i64) -> DayOfWeek {
        DayOfWeek::from_store(index).unwrap()
    }

    fn series() -> SensorSeries {
        let mut rows = Vec::new();
        for (eco2, sound, light) in [
            (400.0, 30.0, 100.0),
            (410.0, 31.0, 110.0),
            (800.0, 50.0, 300.0),
            (820.0, 52.0, 310.0),
            (1500.0, 80.0, 600.0),
            (1520.0, 82.0, 620.0),
        ] {
            rows.push(SeriesRow::new(day(1), 9, PerMetric::new(eco2, sound, light)));
        }
        rows.push(SeriesRow::new(day(1), 10, PerMetric::new(500.0, 40.0, 200.0)));
        SensorSeries::new("thingy001", Some("Office".to_string()), rows)
    }

    #[test]
    fn build_records_stats_and_cutoffs_per_slot() {
        let store = StatisticsStore::build([&series()]);

        let eco2 = store.lookup("thingy001", day(1), 9, Metric::Eco2).unwrap();
        assert!((eco2.mean - 908.333_333_333).abs() < 1e-6);
        assert!(eco2.std > 0.0);

        let cutoffs = store.thresholds("thingy001", day(1), 9, Metric::Eco2).unwrap();
        assert!((cutoffs.medium - 810.0).abs() < 1e-9);
        assert!((cutoffs.high - 1510.0).abs() < 1e-9);

        let single = store.lookup("thingy001", day(1), 10, Metric::Sound).unwrap();
        assert_eq!(single.mean, 40.0);
        assert_eq!(single.std, 0.0);
    }

    #[test]
    fn absent_slot_fails_loudly() {
        let store = StatisticsStore::build([&series()]);
        assert!(matches!(
            store.lookup("thingy001", day(2), 9, Metric::Eco2),
            Err(ForecastError::MissingStatistics { day: 2, hour: 9, .. })
        ));
        assert!(matches!(
            store.thresholds("thingy999", day(1), 9, Metric::Light),
            Err(ForecastError::MissingThresholds { metric: Metric::Light, .. })
        ));
    }

    #[test]
    fn serializes_as_nested_sensor_day_hour_maps() {
        let store = StatisticsStore::build([&series()]);
        let json = serde_json::to_value(&store.normalization).unwrap();
        assert_eq!(json["thingy001"]["1"]["10"]["sound"]["mean"], 40.0);

        let parsed: NormalizationParams = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.slot_count(), 2);
        let eco2 = parsed.entry("thingy001", day(1), 9).unwrap().eco2;
        assert!((eco2.mean - 908.333_333_333).abs() < 1e-6);
    }
}
