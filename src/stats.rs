mod kmeans;
mod store;

pub use kmeans::{kmeans_1d, quantile_sorted, severity_cutoffs};
pub use store::{NormalizationParams, SeverityThresholds, StatisticsStore, Thresholds};

use crate::days::DayOfWeek;
use crate::metrics::{Metric, PerMetric};
use crate::series::SeriesRow;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// A (day-of-week, hour) slot.
pub type Slot = (DayOfWeek, u8);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub mean: f64,
    pub std: f64,
}

impl GroupStats {
    /// Mean and Bessel-corrected standard deviation. A single sample has no spread,
    /// so its std is 0 rather than undefined.
    pub fn from_samples(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mean = values.iter().mean();
        let std = if values.len() < 2 {
            0.0
        } else {
            values.iter().std_dev()
        };
        Some(Self {
            mean,
            std: if std.is_finite() { std } else { 0.0 },
        })
    }

    pub fn normalize(&self, value: f64) -> f64 {
        normalize(value, self.mean, self.std)
    }

    pub fn denormalize(&self, value: f64) -> f64 {
        denormalize(value, self.mean, self.std)
    }
}

/// z-score of `value`; zero-variance groups normalize to 0.
pub fn normalize(value: f64, mean: f64, std: f64) -> f64 {
    if std == 0.0 || !std.is_finite() {
        0.0
    } else {
        (value - mean) / std
    }
}

pub fn denormalize(value: f64, mean: f64, std: f64) -> f64 {
    value * std + mean
}

/// Per-slot metric samples, in slot order.
pub fn slot_samples(rows: &[SeriesRow]) -> BTreeMap<Slot, PerMetric<Vec<f64>>> {
    let mut groups: BTreeMap<Slot, PerMetric<Vec<f64>>> = BTreeMap::new();
    for row in rows {
        let group = groups.entry((row.day, row.hour)).or_default();
        for metric in Metric::ALL {
            group.get_mut(metric).push(*row.values.get(metric));
        }
    }
    groups
}

pub fn slot_stats(rows: &[SeriesRow]) -> BTreeMap<Slot, PerMetric<GroupStats>> {
    slot_samples(rows)
        .into_iter()
        .filter_map(|(slot, samples)| {
            let stats = samples.try_map(|_, values| GroupStats::from_samples(&values).ok_or(()));
            stats.ok().map(|stats| (slot, stats))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_std_normalizes_to_zero() {
        assert_eq!(normalize(512.0, 400.0, 0.0), 0.0);
        assert_eq!(normalize(-3.0, 400.0, 0.0), 0.0);
        assert_eq!(normalize(400.0, 400.0, f64::NAN), 0.0);
    }

    #[test]
    fn normalize_then_denormalize_restores_value() {
        for (value, mean, std) in [(612.0, 480.5, 37.2), (0.0, 12.0, 3.0), (55.5, 55.5, 0.1)] {
            let z = normalize(value, mean, std);
            let back = denormalize(z, mean, std);
            assert!((back - value).abs() < 1e-9, "{value} -> {z} -> {back}");
        }
    }

    #[test]
    fn group_stats_use_sample_standard_deviation() {
        let stats = GroupStats::from_samples(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((stats.mean - 5.0).abs() < 1e-12);
        // population std is 2.0; Bessel-corrected is sqrt(32 / 7)
        assert!((stats.std - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn single_sample_group_has_zero_std() {
        let stats = GroupStats::from_samples(&[42.0]).unwrap();
        assert_eq!(stats.mean, 42.0);
        assert_eq!(stats.std, 0.0);
        assert!(GroupStats::from_samples(&[]).is_none());
    }
}
