use super::denormalize::DenormalizedStep;
use crate::artifacts::ArtifactBundle;
use crate::error::ForecastResult;
use crate::metrics::{Metric, PerMetric};
use crate::stats::Thresholds;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorCode {
    Green,
    Orange,
    Red,
}

impl ColorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ColorCode::Green => "green",
            ColorCode::Orange => "orange",
            ColorCode::Red => "red",
        }
    }
}

impl fmt::Display for ColorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two metrics above their high cutoff is red. Two above medium, or one high
/// plus one medium, is orange. A value equal to a cutoff does not exceed it.
pub fn classify(values: &PerMetric<f64>, thresholds: &PerMetric<Thresholds>) -> ColorCode {
    let mut high = 0;
    let mut mid = 0;
    for metric in Metric::ALL {
        let value = *values.get(metric);
        let cutoffs = thresholds.get(metric);
        if value > cutoffs.high {
            high += 1;
        } else if value > cutoffs.medium {
            mid += 1;
        }
    }

    if high >= 2 {
        ColorCode::Red
    } else if mid >= 2 || (high >= 1 && mid >= 1) {
        ColorCode::Orange
    } else {
        ColorCode::Green
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SeverityClassifier<'a> {
    bundle: &'a ArtifactBundle,
}

impl<'a> SeverityClassifier<'a> {
    pub fn new(bundle: &'a ArtifactBundle) -> Self {
        Self { bundle }
    }

    pub fn classify_step(&self, sensor: &str, step: &DenormalizedStep) -> ForecastResult<ColorCode> {
        let thresholds = PerMetric::try_from_fn(|metric| {
            self.bundle
                .stats
                .thresholds(sensor, step.target.day, step.target.hour, metric)
        })?;
        Ok(classify(&step.values, &thresholds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cutoffs(medium: f64, high: f64) -> PerMetric<Thresholds> {
        PerMetric::from_fn(|_| Thresholds { medium, high })
    }

    #[test]
    fn one_high_and_one_medium_is_orange() {
        let color = classify(&PerMetric::new(25.0, 5.0, 15.0), &cutoffs(10.0, 20.0));
        assert_eq!(color, ColorCode::Orange);
    }

    #[test]
    fn two_high_is_red() {
        let color = classify(&PerMetric::new(25.0, 22.0, 5.0), &cutoffs(10.0, 20.0));
        assert_eq!(color, ColorCode::Red);
    }

    #[test]
    fn two_medium_is_orange_and_one_medium_is_green() {
        assert_eq!(classify(&PerMetric::new(15.0, 12.0, 1.0), &cutoffs(10.0, 20.0)), ColorCode::Orange);
        assert_eq!(classify(&PerMetric::new(15.0, 2.0, 1.0), &cutoffs(10.0, 20.0)), ColorCode::Green);
        assert_eq!(classify(&PerMetric::new(25.0, 2.0, 1.0), &cutoffs(10.0, 20.0)), ColorCode::Green);
    }

    #[test]
    fn values_on_a_cutoff_do_not_count() {
        assert_eq!(classify(&PerMetric::new(20.0, 20.0, 10.0), &cutoffs(10.0, 20.0)), ColorCode::Orange);
        assert_eq!(classify(&PerMetric::new(10.0, 10.0, 10.0), &cutoffs(10.0, 20.0)), ColorCode::Green);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ColorCode::Orange).unwrap(), "\"orange\"");
        assert_eq!(ColorCode::Red.to_string(), "red");
    }
}
