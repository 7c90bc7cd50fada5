use super::denormalize::{DenormalizedStep, ResultDenormalizer};
use super::predictor::{ModelVariant, Predictor};
use super::query::{order_buckets, BucketReading, QueryWindow, WindowMode};
use super::severity::{ColorCode, SeverityClassifier};
use super::targets::forecast_targets;
use super::timestamps::{format_timestamp, prediction_timestamp};
use super::window::{WindowBuilder, WindowTensor};
use crate::artifacts::ArtifactBundle;
use crate::error::ForecastError;
use crate::features::FeatureLayout;
use crate::rooms::RoomDirectory;
use crate::series::HourlyAggregate;
use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Hourly averages of one sensor inside a query window.
#[allow(async_fn_in_trait)]
pub trait ReadingSource {
    async fn hourly_buckets(&self, sensor: &str, window: &QueryWindow) -> Result<Vec<BucketReading>>;
}

/// Stores one forecast document per (sensor, model variant), replacing the previous one.
#[allow(async_fn_in_trait)]
pub trait ForecastSink {
    async fn upsert_forecast(&self, document: &ForecastDocument) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastEntry {
    pub timestamp: String,
    pub co2_level: u32,
    pub light_level: u32,
    pub sound_level: u32,
    pub color_code: ColorCode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDocument {
    pub sensor: String,
    pub model_type: ModelVariant,
    pub timestamp: String,
    pub predictions: Vec<ForecastEntry>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub sensors: usize,
    pub forecasted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub documents: usize,
}

enum SensorOutcome {
    Forecasted { documents: usize, failed_variants: usize },
    Skipped,
}

#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub layout: FeatureLayout,
    pub mode: WindowMode,
    pub variants: Vec<ModelVariant>,
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            layout: FeatureLayout::default(),
            mode: WindowMode::default(),
            variants: ModelVariant::ALL.to_vec(),
        }
    }
}

/// One pass over every trained sensor: window, predict, denormalize, classify,
/// persist. Sensors are handled one after another and failures stay local to
/// the sensor.
pub struct ForecastCycle<'a, S, P, K> {
    bundle: &'a ArtifactBundle,
    rooms: &'a RoomDirectory,
    source: &'a S,
    predictor: &'a P,
    sink: &'a K,
    settings: CycleSettings,
}

impl<'a, S, P, K> ForecastCycle<'a, S, P, K>
where
    S: ReadingSource,
    P: Predictor,
    K: ForecastSink,
{
    pub fn new(
        bundle: &'a ArtifactBundle,
        rooms: &'a RoomDirectory,
        source: &'a S,
        predictor: &'a P,
        sink: &'a K,
        settings: CycleSettings,
    ) -> Self {
        Self {
            bundle,
            rooms,
            source,
            predictor,
            sink,
            settings,
        }
    }

    pub async fn run<Tz: TimeZone>(&self, now: DateTime<Tz>) -> CycleReport {
        let window = QueryWindow::at(&now, self.settings.mode);
        let mut report = CycleReport::default();

        for sensor in self.bundle.sensors() {
            report.sensors += 1;
            match self.forecast_sensor(sensor, &window, &now).await {
                Ok(SensorOutcome::Forecasted {
                    documents,
                    failed_variants,
                }) => {
                    report.documents += documents;
                    if failed_variants == 0 {
                        report.forecasted += 1;
                    } else {
                        report.failed += 1;
                    }
                }
                Ok(SensorOutcome::Skipped) => report.skipped += 1,
                Err(err) => {
                    tracing::warn!(sensor, error = %format!("{err:#}"), "forecast failed for sensor");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            mode = %self.settings.mode,
            sensors = report.sensors,
            forecasted = report.forecasted,
            skipped = report.skipped,
            failed = report.failed,
            documents = report.documents,
            "forecast cycle finished"
        );
        report
    }

    async fn forecast_sensor<Tz: TimeZone>(
        &self,
        sensor: &str,
        window: &QueryWindow,
        now: &DateTime<Tz>,
    ) -> Result<SensorOutcome> {
        let readings = self.source.hourly_buckets(sensor, window).await?;
        let tz = now.timezone();
        let buckets = order_buckets(
            window.start_hour,
            readings.iter().map(|reading| reading.in_zone(&tz)).collect(),
        );
        let roomtype = self.rooms.roomtype(sensor);
        let aggregates: Vec<HourlyAggregate> = buckets
            .iter()
            .map(|bucket| HourlyAggregate::from_bucket(bucket, roomtype))
            .collect();

        let tensor = match WindowBuilder::new(self.bundle, self.settings.layout).build(&aggregates) {
            Ok(tensor) => tensor,
            Err(err @ ForecastError::IncompleteWindow { .. }) => {
                tracing::warn!(sensor, error = %err, "skipping sensor");
                return Ok(SensorOutcome::Skipped);
            }
            Err(err) => return Err(err.into()),
        };

        let local_now = now.naive_local();
        let mut documents = 0;
        let mut failed_variants = 0;
        for variant in &self.settings.variants {
            let stored = match self.forecast_variant(*variant, &tensor, local_now).await {
                Ok(document) => self.sink.upsert_forecast(&document).await,
                Err(err) => Err(err),
            };
            match stored {
                Ok(()) => documents += 1,
                Err(err) => {
                    tracing::warn!(sensor, variant = %variant, error = %format!("{err:#}"), "model variant failed");
                    failed_variants += 1;
                }
            }
        }
        Ok(SensorOutcome::Forecasted {
            documents,
            failed_variants,
        })
    }

    async fn forecast_variant(
        &self,
        variant: ModelVariant,
        tensor: &WindowTensor,
        now: NaiveDateTime,
    ) -> Result<ForecastDocument> {
        let rows = self.predictor.predict(variant, tensor).await?;
        let targets = forecast_targets(tensor.last_day, tensor.last_hour);
        let steps = ResultDenormalizer::new(self.bundle, tensor.layout).denormalize(&tensor.sensor, &rows, &targets)?;

        let classifier = SeverityClassifier::new(self.bundle);
        let predictions = steps
            .iter()
            .map(|step| forecast_entry(&classifier, &tensor.sensor, step, now))
            .collect::<Result<Vec<_>>>()?;

        Ok(ForecastDocument {
            sensor: tensor.sensor.clone(),
            model_type: variant,
            timestamp: format_timestamp(now),
            predictions,
        })
    }
}

fn forecast_entry(
    classifier: &SeverityClassifier<'_>,
    sensor: &str,
    step: &DenormalizedStep,
    now: NaiveDateTime,
) -> Result<ForecastEntry> {
    let color_code = classifier.classify_step(sensor, step)?;
    let timestamp = prediction_timestamp(now, step.target.day, step.target.hour)?;
    Ok(ForecastEntry {
        timestamp: format_timestamp(timestamp),
        co2_level: step.values.eco2 as u32,
        light_level: step.values.light as u32,
        sound_level: step.values.sound as u32,
        color_code,
    })
}
