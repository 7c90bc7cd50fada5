use super::targets::{ForecastTarget, HORIZON};
use crate::artifacts::ArtifactBundle;
use crate::error::{ForecastError, ForecastResult};
use crate::features::FeatureLayout;
use crate::metrics::PerMetric;
use crate::stats::GroupStats;

/// One predicted step back on the sensor's own scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DenormalizedStep {
    pub target: ForecastTarget,
    pub values: PerMetric<f64>,
}

/// `z * std + mean`, clamped to zero and rounded to a whole reading.
pub fn restore_level(z: f64, stats: &GroupStats) -> f64 {
    let value = stats.denormalize(z);
    if value.is_finite() {
        value.max(0.0).round()
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResultDenormalizer<'a> {
    bundle: &'a ArtifactBundle,
    layout: FeatureLayout,
}

impl<'a> ResultDenormalizer<'a> {
    pub fn new(bundle: &'a ArtifactBundle, layout: FeatureLayout) -> Self {
        Self { bundle, layout }
    }

    /// Maps each predicted row through the statistics of the slot it forecasts,
    /// not the slot of the input row it came after.
    pub fn denormalize(
        &self,
        sensor: &str,
        predictions: &[Vec<f64>],
        targets: &[ForecastTarget; HORIZON],
    ) -> ForecastResult<Vec<DenormalizedStep>> {
        check_shape(predictions, HORIZON, self.layout.width())?;

        predictions
            .iter()
            .zip(targets)
            .map(|(row, target)| -> ForecastResult<DenormalizedStep> {
                let stats = self.bundle.stats.slot(sensor, target.day, target.hour)?;
                let values = PerMetric::from_fn(|metric| {
                    restore_level(row[self.layout.metric_column(metric)], stats.get(metric))
                });
                Ok(DenormalizedStep {
                    target: *target,
                    values,
                })
            })
            .collect()
    }
}

pub fn check_shape(rows: &[Vec<f64>], expected_rows: usize, expected_width: usize) -> ForecastResult<()> {
    let bad_width = rows.iter().map(Vec::len).find(|width| *width != expected_width);
    if rows.len() != expected_rows || bad_width.is_some() {
        return Err(ForecastError::PredictionShape {
            rows: rows.len(),
            width: bad_width.unwrap_or(expected_width),
            expected_rows,
            expected_width,
        });
    }
    Ok(())
}
