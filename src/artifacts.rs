use crate::encoding::{CategoryKind, LabelEncoder};
use crate::stats::{NormalizationParams, SeverityThresholds, StatisticsStore};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

pub const NORMALIZATION_FILE: &str = "normalization_params.json";
pub const THRESHOLDS_FILE: &str = "thresholds.json";
pub const SENSOR_ENCODER_FILE: &str = "sensor_label_encoder.json";
pub const ROOMTYPE_ENCODER_FILE: &str = "roomtype_label_encoder.json";

/// Everything inference needs from a training run. Loaded once, then shared
/// read-only by every cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactBundle {
    pub stats: StatisticsStore,
    pub sensor_encoder: LabelEncoder,
    pub roomtype_encoder: LabelEncoder,
}

impl ArtifactBundle {
    pub fn new(stats: StatisticsStore, sensor_encoder: LabelEncoder, roomtype_encoder: LabelEncoder) -> Self {
        Self {
            stats,
            sensor_encoder,
            roomtype_encoder,
        }
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let normalization: NormalizationParams = read_json(&dir.join(NORMALIZATION_FILE))?;
        let thresholds: SeverityThresholds = read_json(&dir.join(THRESHOLDS_FILE))?;
        let sensor_encoder: LabelEncoder = read_json(&dir.join(SENSOR_ENCODER_FILE))?;
        let roomtype_encoder: LabelEncoder = read_json(&dir.join(ROOMTYPE_ENCODER_FILE))?;

        if sensor_encoder.kind() != CategoryKind::Sensor || roomtype_encoder.kind() != CategoryKind::Roomtype {
            anyhow::bail!("label encoder files in {} are swapped or mislabeled", dir.display());
        }

        tracing::info!(
            dir = %dir.display(),
            sensors = sensor_encoder.len(),
            roomtypes = roomtype_encoder.len(),
            slots = normalization.slot_count(),
            "loaded model artifacts"
        );
        Ok(Self::new(
            StatisticsStore::new(normalization, thresholds),
            sensor_encoder,
            roomtype_encoder,
        ))
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
        write_json(&dir.join(NORMALIZATION_FILE), &self.stats.normalization)?;
        write_json(&dir.join(THRESHOLDS_FILE), &self.stats.thresholds)?;
        write_json(&dir.join(SENSOR_ENCODER_FILE), &self.sensor_encoder)?;
        write_json(&dir.join(ROOMTYPE_ENCODER_FILE), &self.roomtype_encoder)?;
        Ok(())
    }

    /// Sensors the model was trained on, in encoder order.
    pub fn sensors(&self) -> impl Iterator<Item = &str> {
        self.sensor_encoder.classes().iter().map(String::as_str)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&contents).with_context(|| format!("failed to parse {}", path.display()))
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = std::fs::File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).with_context(|| format!("failed to write {}", path.display()))?;
    writer.flush().with_context(|| format!("failed to flush {}", path.display()))
}
