mod cli;

use crate::cli::{Cli, Commands, PredictArgs, PrepareArgs, PruneArgs};
use anyhow::Result;
use chrono::Local;
use clap::Parser;
use sensor_forecast::artifacts::ArtifactBundle;
use sensor_forecast::config::Config;
use sensor_forecast::db::PgStore;
use sensor_forecast::features::FeatureLayout;
use sensor_forecast::inference::{CycleSettings, ForecastCycle, HttpPredictor, WindowMode};
use sensor_forecast::prep::{run_prepare, PrepareOptions};
use sensor_forecast::rooms::RoomDirectory;
use tokio::time::MissedTickBehavior;

fn init_tracing(config: &Config) -> Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{runtime::Tokio, trace::Config as OTelTraceConfig, Resource};
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,sensor_forecast=info".into());
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    if let Some(endpoint) = &config.otlp_endpoint {
        let endpoint = normalize_otlp_http_endpoint(endpoint);
        let exporter = opentelemetry_otlp::new_exporter()
            .http()
            .with_endpoint(endpoint);
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(exporter)
            .with_trace_config(OTelTraceConfig::default().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "sensor-forecast"),
            ])))
            .install_batch(Tokio)?;

        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}

fn normalize_otlp_http_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.contains("/v1/traces") {
        return trimmed.to_string();
    }
    format!("{}/v1/traces", trimmed.trim_end_matches('/'))
}

async fn connect_store(config: &Config) -> Result<PgStore> {
    let store = PgStore::connect(config.require_database_url()?, config.db_pool_size).await?;
    store.ensure_schema().await?;
    Ok(store)
}

async fn predict(config: &Config, args: &PredictArgs) -> Result<()> {
    let store = connect_store(config).await?;
    let bundle = ArtifactBundle::load(&config.artifact_dir)?;
    let rooms = RoomDirectory::load(&config.room_table_path)?;
    let predictor = HttpPredictor::new(&config.model_url, config.model_token.clone(), config.model_timeout())?;
    let settings = CycleSettings {
        layout: config.layout,
        mode: if args.live { WindowMode::Live } else { config.window_mode },
        variants: config.variants.clone(),
    };
    let cycle = ForecastCycle::new(&bundle, &rooms, &store, &predictor, &store, settings);

    if !args.schedule {
        cycle.run(Local::now()).await;
        return Ok(());
    }

    tracing::info!(
        interval_secs = config.interval_seconds,
        retention_days = config.retention_days,
        "starting scheduled forecasts"
    );
    let mut ticker = tokio::time::interval(config.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = store.prune_readings(config.retention_days).await {
                    tracing::warn!(error = %format!("{err:#}"), "failed to prune readings");
                }
                cycle.run(Local::now()).await;
            }
            _ = &mut shutdown => {
                tracing::info!("shutdown signal received");
                break;
            }
        }
    }
    Ok(())
}

fn prepare(config: &Config, args: &PrepareArgs) -> Result<()> {
    let room_table = args.rooms.as_ref().unwrap_or(&config.room_table_path);
    let rooms = RoomDirectory::load(room_table)?;
    let defaults = PrepareOptions::default();
    let options = PrepareOptions {
        val_ratio: args.val_ratio.unwrap_or(defaults.val_ratio),
        test_ratio: args.test_ratio.unwrap_or(defaults.test_ratio),
        layout: if args.without_roomtype {
            FeatureLayout::WithoutRoomtype
        } else {
            config.layout
        },
    };
    if !(0.0..1.0).contains(&(options.val_ratio + options.test_ratio)) {
        anyhow::bail!(
            "val ratio {} and test ratio {} must leave room for training data",
            options.val_ratio,
            options.test_ratio
        );
    }
    run_prepare(&args.readings, &rooms, &args.output, options)?;
    Ok(())
}

async fn prune(config: &Config, args: &PruneArgs) -> Result<()> {
    let store = connect_store(config).await?;
    store.prune_readings(args.days.unwrap_or(config.retention_days)).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(&config)?;

    match &cli.command {
        Commands::Predict(args) => predict(&config, args).await,
        Commands::Prepare(args) => prepare(&config, args),
        Commands::Prune(args) => prune(&config, args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otlp_endpoint_gets_traces_path() {
        assert_eq!(
            normalize_otlp_http_endpoint("http://collector:4318/"),
            "http://collector:4318/v1/traces"
        );
        assert_eq!(
            normalize_otlp_http_endpoint("http://collector:4318/v1/traces"),
            "http://collector:4318/v1/traces"
        );
        assert_eq!(normalize_otlp_http_endpoint("  "), "");
    }
}
