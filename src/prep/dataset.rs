use super::aggregate::{hourly_series, load_readings_dir};
use super::outliers::filter_series;
use super::repair::repair_series;
use super::splitter::{split_many, SequenceSplit, INPUT_WINDOW, OUTPUT_HORIZON};
use crate::artifacts::{write_json, ArtifactBundle};
use crate::encoding::{CategoryKind, LabelEncoder};
use crate::features::{FeatureEncoder, FeatureLayout};
use crate::rooms::RoomDirectory;
use crate::series::SensorSeries;
use crate::stats::StatisticsStore;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

pub const DATASET_FILE: &str = "dataset.json";
pub const CLEANED_DIR: &str = "cleaned";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrepareOptions {
    pub val_ratio: f64,
    pub test_ratio: f64,
    pub layout: FeatureLayout,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            val_ratio: super::splitter::DEFAULT_VAL_RATIO,
            test_ratio: super::splitter::DEFAULT_TEST_RATIO,
            layout: FeatureLayout::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrepareReport {
    pub sensors_seen: usize,
    pub sensors_kept: usize,
    pub skipped: Vec<String>,
    pub outlier_rows: usize,
    pub partial_days: usize,
    pub inserted_days: usize,
    pub train_windows: usize,
    pub val_windows: usize,
    pub test_windows: usize,
}

#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub bundle: ArtifactBundle,
    pub series: Vec<SensorSeries>,
    pub layout: FeatureLayout,
    pub split: SequenceSplit<Vec<f64>>,
    pub report: PrepareReport,
}

#[derive(Serialize)]
struct DatasetFile<'a> {
    columns: Vec<String>,
    input_window: usize,
    output_horizon: usize,
    #[serde(flatten)]
    split: &'a SequenceSplit<Vec<f64>>,
}

#[derive(Serialize)]
struct CleanedRecord<'a> {
    sensor: &'a str,
    roomtype: &'a str,
    day: u8,
    hour: u8,
    #[serde(rename = "eCO2")]
    eco2: f64,
    sound: f64,
    light: f64,
}

/// Cleans each sensor series, fits statistics and encoders on the result,
/// encodes every row and cuts the training windows.
pub fn prepare(raw: Vec<SensorSeries>, rooms: &RoomDirectory, options: PrepareOptions) -> PreparedDataset {
    let mut report = PrepareReport {
        sensors_seen: raw.len(),
        ..PrepareReport::default()
    };

    let mut cleaned = Vec::with_capacity(raw.len());
    for series in raw {
        if options.layout.has_roomtype() && series.roomtype.is_none() {
            tracing::warn!(sensor = %series.sensor, "no room type for sensor; sensor skipped");
            report.skipped.push(series.sensor);
            continue;
        }
        let (filtered, filter_report) = filter_series(&series);
        report.outlier_rows += filter_report.outlier_rows;
        report.partial_days += filter_report.partial_days;
        if filtered.is_empty() {
            tracing::warn!(sensor = %series.sensor, "no complete days left after filtering; sensor skipped");
            report.skipped.push(series.sensor);
            continue;
        }

        let outcome = repair_series(&filtered);
        report.inserted_days += outcome.inserted_days.len();
        match outcome.into_series() {
            Ok(repaired) => cleaned.push(repaired),
            Err(err) => {
                tracing::warn!(sensor = %series.sensor, error = %err, "sensor skipped");
                report.skipped.push(series.sensor);
            }
        }
    }

    let stats = StatisticsStore::build(&cleaned);
    let sensor_encoder = LabelEncoder::fit(CategoryKind::Sensor, cleaned.iter().map(|s| s.sensor.as_str()));
    let roomtype_encoder = LabelEncoder::fit(CategoryKind::Roomtype, rooms.roomtypes());
    let bundle = ArtifactBundle::new(stats, sensor_encoder, roomtype_encoder);

    let encoder = FeatureEncoder::new(&bundle, options.layout);
    let mut encoded: Vec<Vec<Vec<f64>>> = Vec::with_capacity(cleaned.len());
    let mut kept = Vec::with_capacity(cleaned.len());
    for series in cleaned {
        let rows = series
            .rows
            .iter()
            .map(|row| encoder.encode(&series.sensor, series.roomtype.as_deref(), row.day, row.hour, &row.values))
            .collect::<Result<Vec<_>, _>>();
        match rows {
            Ok(rows) => {
                encoded.push(rows);
                kept.push(series);
            }
            Err(err) => {
                tracing::warn!(sensor = %series.sensor, error = %err, "feature encoding failed; sensor skipped");
                report.skipped.push(series.sensor);
            }
        }
    }

    let split = split_many(
        encoded.iter().map(Vec::as_slice),
        INPUT_WINDOW,
        OUTPUT_HORIZON,
        options.val_ratio,
        options.test_ratio,
    );
    report.sensors_kept = kept.len();
    report.train_windows = split.train.len();
    report.val_windows = split.val.len();
    report.test_windows = split.test.len();

    PreparedDataset {
        bundle,
        series: kept,
        layout: options.layout,
        split,
        report,
    }
}

impl PreparedDataset {
    /// Writes the artifact bundle, one cleaned CSV per sensor and `dataset.json`.
    pub fn write(&self, output: &Path) -> Result<()> {
        self.bundle.save(output)?;

        let cleaned_dir = output.join(CLEANED_DIR);
        std::fs::create_dir_all(&cleaned_dir).with_context(|| format!("failed to create {}", cleaned_dir.display()))?;
        for series in &self.series {
            let path = cleaned_dir.join(format!("{}.csv", series.sensor));
            let mut writer =
                csv::Writer::from_path(&path).with_context(|| format!("failed to create {}", path.display()))?;
            for row in &series.rows {
                writer.serialize(CleanedRecord {
                    sensor: &series.sensor,
                    roomtype: series.roomtype.as_deref().unwrap_or_default(),
                    day: row.day.store_index(),
                    hour: row.hour,
                    eco2: row.values.eco2,
                    sound: row.values.sound,
                    light: row.values.light,
                })?;
            }
            writer.flush().with_context(|| format!("failed to write {}", path.display()))?;
        }

        write_json(
            &output.join(DATASET_FILE),
            &DatasetFile {
                columns: self.layout.column_names(),
                input_window: INPUT_WINDOW,
                output_horizon: OUTPUT_HORIZON,
                split: &self.split,
            },
        )
    }
}

/// `prepare` subcommand: raw exports on disk in, artifacts and datasets on disk out.
pub fn run_prepare(readings_dir: &Path, rooms: &RoomDirectory, output: &Path, options: PrepareOptions) -> Result<PrepareReport> {
    let readings = load_readings_dir(readings_dir)?;
    if readings.is_empty() {
        anyhow::bail!("no paired readings found in {}", readings_dir.display());
    }
    let series = hourly_series(&readings, rooms);
    tracing::info!(readings = readings.len(), sensors = series.len(), "aggregated raw readings");

    let prepared = prepare(series, rooms, options);
    prepared.write(output)?;
    tracing::info!(
        output = %output.display(),
        sensors = prepared.report.sensors_kept,
        skipped = prepared.report.skipped.len(),
        train = prepared.report.train_windows,
        val = prepared.report.val_windows,
        test = prepared.report.test_windows,
        "prepared training data"
    );
    Ok(prepared.report)
}
