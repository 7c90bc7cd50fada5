use crate::features::FeatureLayout;
use crate::inference::{ModelVariant, WindowMode};
use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_SETUP_CONFIG_PATH: &str = "/etc/sensor-forecast/config.json";

fn setup_config_path() -> PathBuf {
    if let Ok(path) = env::var("FORECAST_SETUP_CONFIG_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    if let Ok(state_dir) = env::var("FORECAST_STATE_DIR") {
        let trimmed = state_dir.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed).join("config.json");
        }
    }
    PathBuf::from(DEFAULT_SETUP_CONFIG_PATH)
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SetupConfigOverrides {
    #[serde(default)]
    database_url: Option<String>,
    #[serde(default)]
    db_pool_size: Option<u32>,
    #[serde(default)]
    artifact_dir: Option<String>,
    #[serde(default)]
    room_table_path: Option<String>,
    #[serde(default)]
    model_url: Option<String>,
    #[serde(default)]
    model_token: Option<String>,
    #[serde(default)]
    model_timeout_ms: Option<u64>,
    #[serde(default)]
    model_variants: Option<Vec<String>>,
    #[serde(default)]
    feature_layout: Option<String>,
    #[serde(default)]
    window_mode: Option<String>,
    #[serde(default)]
    interval_seconds: Option<u64>,
    #[serde(default)]
    retention_days: Option<u32>,
}

fn load_setup_config_overrides(path: &Path) -> Option<SetupConfigOverrides> {
    if !path.exists() {
        return None;
    }
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "sensor-forecast failed to read setup config; using env defaults"
            );
            return None;
        }
    };
    let mut bytes = contents.into_bytes();
    match simd_json::serde::from_slice(&mut bytes) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "sensor-forecast failed to parse setup config; using env defaults"
            );
            None
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn apply_setup_overrides(config: &mut Config, overrides: &SetupConfigOverrides, env_allows: impl Fn(&str) -> bool) {
    if env_allows("FORECAST_DB_POOL_SIZE") {
        if let Some(value) = overrides.db_pool_size.filter(|v| *v != 0) {
            config.db_pool_size = value;
        }
    }
    if env_allows("FORECAST_ARTIFACT_DIR") {
        if let Some(dir) = non_empty(overrides.artifact_dir.as_deref()) {
            config.artifact_dir = PathBuf::from(dir);
        }
    }
    if env_allows("FORECAST_ROOM_TABLE_PATH") {
        if let Some(path) = non_empty(overrides.room_table_path.as_deref()) {
            config.room_table_path = PathBuf::from(path);
        }
    }
    if env_allows("FORECAST_MODEL_URL") {
        if let Some(url) = non_empty(overrides.model_url.as_deref()) {
            config.model_url = url;
        }
    }
    if env_allows("FORECAST_MODEL_TOKEN") {
        if let Some(token) = overrides.model_token.as_deref() {
            config.model_token = non_empty(Some(token));
        }
    }
    if env_allows("FORECAST_MODEL_TIMEOUT_MS") {
        if let Some(value) = overrides.model_timeout_ms.filter(|v| *v != 0) {
            config.model_timeout_ms = value;
        }
    }
    if env_allows("FORECAST_MODEL_VARIANTS") {
        if let Some(raw) = overrides.model_variants.as_ref() {
            let variants = parse_variants(raw.iter().map(String::as_str));
            if !variants.is_empty() {
                config.variants = variants;
            }
        }
    }
    if env_allows("FORECAST_FEATURE_LAYOUT") {
        if let Some(layout) = overrides
            .feature_layout
            .as_deref()
            .and_then(|v| v.parse::<FeatureLayout>().ok())
        {
            config.layout = layout;
        }
    }
    if env_allows("FORECAST_WINDOW_MODE") {
        if let Some(mode) = overrides
            .window_mode
            .as_deref()
            .and_then(|v| v.parse::<WindowMode>().ok())
        {
            config.window_mode = mode;
        }
    }
    if env_allows("FORECAST_INTERVAL_SECONDS") {
        if let Some(value) = overrides.interval_seconds.filter(|v| *v != 0) {
            config.interval_seconds = value;
        }
    }
    if env_allows("FORECAST_RETENTION_DAYS") {
        if let Some(value) = overrides.retention_days.filter(|v| *v != 0) {
            config.retention_days = value;
        }
    }
}

/// Unknown names are logged and dropped.
fn parse_variants<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<ModelVariant> {
    let mut variants = Vec::new();
    for name in names.into_iter().map(str::trim).filter(|v| !v.is_empty()) {
        match name.parse::<ModelVariant>() {
            Ok(variant) if !variants.contains(&variant) => variants.push(variant),
            Ok(_) => {}
            Err(err) => tracing::warn!(name, error = %err, "ignoring model variant"),
        }
    }
    variants
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: Option<String>,
    pub db_pool_size: u32,
    pub artifact_dir: PathBuf,
    pub room_table_path: PathBuf,
    pub model_url: String,
    pub model_token: Option<String>,
    pub model_timeout_ms: u64,
    pub variants: Vec<ModelVariant>,
    pub layout: FeatureLayout,
    pub window_mode: WindowMode,
    pub interval_seconds: u64,
    pub retention_days: u32,
    pub otlp_endpoint: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok(), &setup_config_path())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>, setup_path: &Path) -> Result<Self> {
        let setup_overrides = load_setup_config_overrides(setup_path);
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = var("FORECAST_DATABASE_URL")
            .or_else(|| var("DATABASE_URL"))
            .or_else(|| {
                setup_overrides
                    .as_ref()
                    .and_then(|ov| non_empty(ov.database_url.as_deref()))
            })
            .map(normalize_database_url);

        let db_pool_size = var("FORECAST_DB_POOL_SIZE")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(5);
        let artifact_dir = var("FORECAST_ARTIFACT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("artifacts"));
        let room_table_path = var("FORECAST_ROOM_TABLE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("rooms.csv"));
        let model_url = var("FORECAST_MODEL_URL").unwrap_or_else(|| "http://127.0.0.1:8501".to_string());
        let model_token = var("FORECAST_MODEL_TOKEN");
        let model_timeout_ms = var("FORECAST_MODEL_TIMEOUT_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(10_000);
        let variants = var("FORECAST_MODEL_VARIANTS")
            .map(|v| parse_variants(v.split(',')))
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| ModelVariant::ALL.to_vec());
        let layout = var("FORECAST_FEATURE_LAYOUT")
            .and_then(|v| v.parse::<FeatureLayout>().ok())
            .unwrap_or_default();
        let window_mode = var("FORECAST_WINDOW_MODE")
            .and_then(|v| v.parse::<WindowMode>().ok())
            .unwrap_or_default();
        let interval_seconds = var("FORECAST_INTERVAL_SECONDS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v != 0)
            .unwrap_or(3600);
        let retention_days = var("FORECAST_RETENTION_DAYS")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(3);
        let otlp_endpoint = var("OTEL_EXPORTER_OTLP_ENDPOINT");

        let mut config = Self {
            database_url,
            db_pool_size,
            artifact_dir,
            room_table_path,
            model_url,
            model_token,
            model_timeout_ms,
            variants,
            layout,
            window_mode,
            interval_seconds,
            retention_days,
            otlp_endpoint,
        };

        if let Some(overrides) = setup_overrides.as_ref() {
            apply_setup_overrides(&mut config, overrides, |key| var(key).is_none());
        }

        Ok(config)
    }

    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("FORECAST_DATABASE_URL or DATABASE_URL is required (or present as database_url in the setup config)")
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_millis(self.model_timeout_ms)
    }
}

fn normalize_database_url(url: String) -> String {
    if let Some(stripped) = url.strip_prefix("postgresql+psycopg://") {
        return format!("postgresql://{stripped}");
    }
    if let Some(stripped) = url.strip_prefix("postgresql+asyncpg://") {
        return format!("postgresql://{stripped}");
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn missing_setup() -> PathBuf {
        PathBuf::from("/nonexistent/sensor-forecast/config.json")
    }

    #[test]
    fn defaults_apply_without_env() {
        let config = Config::from_lookup(lookup(&[]), &missing_setup()).unwrap();
        assert_eq!(config.database_url, None);
        assert!(config.require_database_url().is_err());
        assert_eq!(config.variants, ModelVariant::ALL.to_vec());
        assert_eq!(config.layout, FeatureLayout::WithRoomtype);
        assert_eq!(config.window_mode, WindowMode::Hist);
        assert_eq!(config.interval(), Duration::from_secs(3600));
        assert_eq!(config.retention_days, 3);
        assert_eq!(config.model_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn env_values_are_parsed() {
        let config = Config::from_lookup(
            lookup(&[
                ("DATABASE_URL", "postgresql+asyncpg://forecast@db/forecast"),
                ("FORECAST_MODEL_VARIANTS", "gru, cnn, gru, transformer"),
                ("FORECAST_FEATURE_LAYOUT", "without_roomtype"),
                ("FORECAST_WINDOW_MODE", "live"),
                ("FORECAST_INTERVAL_SECONDS", "0"),
                ("FORECAST_RETENTION_DAYS", "7"),
            ]),
            &missing_setup(),
        )
        .unwrap();
        assert_eq!(config.require_database_url().unwrap(), "postgresql://forecast@db/forecast");
        assert_eq!(config.variants, vec![ModelVariant::Gru, ModelVariant::Cnn]);
        assert_eq!(config.layout, FeatureLayout::WithoutRoomtype);
        assert_eq!(config.window_mode, WindowMode::Live);
        assert_eq!(config.interval_seconds, 3600);
        assert_eq!(config.retention_days, 7);
    }

    #[test]
    fn setup_file_fills_gaps_but_env_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "database_url": "postgresql://setup@db/forecast",
                "model_url": "http://models:8501",
                "model_variants": ["LSTM"],
                "retention_days": 5,
                "window_mode": "live"
            }"#,
        )
        .unwrap();

        let config = Config::from_lookup(lookup(&[("FORECAST_RETENTION_DAYS", "9")]), &path).unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgresql://setup@db/forecast"));
        assert_eq!(config.model_url, "http://models:8501");
        assert_eq!(config.variants, vec![ModelVariant::Lstm]);
        assert_eq!(config.window_mode, WindowMode::Live);
        assert_eq!(config.retention_days, 9);
    }

    #[test]
    fn unreadable_setup_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let config = Config::from_lookup(lookup(&[]), &path).unwrap();
        assert_eq!(config.retention_days, 3);
    }
}
