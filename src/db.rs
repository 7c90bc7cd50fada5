use crate::inference::{BucketReading, ForecastDocument, ForecastSink, QueryWindow, ReadingSource};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

/// Postgres-backed reading store and forecast table.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await
            .context("failed to connect to database")?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sensor_readings (
                sensor text not null,
                ts timestamptz not null,
                eco2 double precision null,
                sound double precision null,
                color_r double precision null,
                color_g double precision null,
                color_b double precision null
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS sensor_readings_sensor_ts ON sensor_readings (sensor, ts)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS forecasts (
                sensor text not null,
                model_type text not null,
                timestamp text not null,
                predictions jsonb not null,
                updated_at timestamptz not null default now(),
                primary key (sensor, model_type)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Deletes readings older than `retention_days`. Returns the number of rows removed.
    pub async fn prune_readings(&self, retention_days: u32) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sensor_readings WHERE ts < now() - make_interval(days => $1)")
            .bind(retention_days as i32)
            .execute(&self.pool)
            .await
            .context("failed to prune sensor readings")?;
        let removed = result.rows_affected();
        tracing::info!(retention_days, removed, "pruned sensor readings");
        Ok(removed)
    }
}

impl ReadingSource for PgStore {
    async fn hourly_buckets(&self, sensor: &str, window: &QueryWindow) -> Result<Vec<BucketReading>> {
        let rows = sqlx::query(
            r#"
            SELECT
                LEAST(date_trunc('hour', ts AT TIME ZONE 'UTC') AT TIME ZONE 'UTC', $4) AS bucket_start,
                AVG(eco2)::float8 AS eco2,
                AVG(sound)::float8 AS sound,
                AVG(color_r)::float8 AS color_r,
                AVG(color_g)::float8 AS color_g,
                AVG(color_b)::float8 AS color_b
            FROM sensor_readings
            WHERE sensor = $1 AND ts >= $2 AND ts < $3
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(sensor)
        .bind(window.start)
        .bind(window.end)
        .bind(window.fold_from)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("failed to load hourly buckets for {sensor}"))?;

        let mut buckets = Vec::with_capacity(rows.len());
        for row in rows {
            let values = (
                row.try_get::<Option<f64>, _>("eco2")?,
                row.try_get::<Option<f64>, _>("sound")?,
                row.try_get::<Option<f64>, _>("color_r")?,
                row.try_get::<Option<f64>, _>("color_g")?,
                row.try_get::<Option<f64>, _>("color_b")?,
            );
            let bucket_start: DateTime<Utc> = row.try_get("bucket_start")?;
            let (Some(eco2), Some(sound), Some(color_r), Some(color_g), Some(color_b)) = values else {
                tracing::debug!(sensor, bucket = %bucket_start, "bucket has no complete readings");
                continue;
            };
            buckets.push(BucketReading {
                sensor: sensor.to_string(),
                bucket_start,
                eco2,
                sound,
                color_r,
                color_g,
                color_b,
            });
        }
        Ok(buckets)
    }
}

impl ForecastSink for PgStore {
    async fn upsert_forecast(&self, document: &ForecastDocument) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO forecasts (sensor, model_type, timestamp, predictions, updated_at)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (sensor, model_type) DO UPDATE
            SET timestamp = EXCLUDED.timestamp,
                predictions = EXCLUDED.predictions,
                updated_at = now()
            "#,
        )
        .bind(&document.sensor)
        .bind(document.model_type.as_str())
        .bind(&document.timestamp)
        .bind(Json(&document.predictions))
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to upsert forecast for {}", document.sensor))?;
        tracing::debug!(sensor = %document.sensor, model = %document.model_type, "forecast stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{ColorCode, ForecastEntry, ModelVariant, WindowMode};
    use chrono::{Duration, TimeZone};
    use std::env;

    async fn setup_test_store(database_url: &str, schema: &str) -> Result<PgStore> {
        let admin_pool = PgPoolOptions::new().max_connections(1).connect(database_url).await?;
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", schema))
            .execute(&admin_pool)
            .await?;
        drop(admin_pool);

        let schema_name = schema.to_string();
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .after_connect(move |conn, _meta| {
                let schema = schema_name.clone();
                Box::pin(async move {
                    sqlx::query(&format!("SET search_path TO {}", schema))
                        .execute(&mut *conn)
                        .await?;
                    // a half-hour session zone must not shift the hourly buckets
                    sqlx::query("SET TIME ZONE 'Asia/Kolkata'").execute(&mut *conn).await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        let store = PgStore::from_pool(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn fetch_forecast(store: &PgStore, sensor: &str, variant: ModelVariant) -> Result<Option<ForecastDocument>> {
        let row = sqlx::query(
            r#"
            SELECT sensor, model_type, timestamp, predictions
            FROM forecasts
            WHERE sensor = $1 AND model_type = $2
            "#,
        )
        .bind(sensor)
        .bind(variant.as_str())
        .fetch_optional(store.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let model_type: String = row.try_get("model_type")?;
        let Json(predictions) = row.try_get("predictions")?;
        Ok(Some(ForecastDocument {
            sensor: row.try_get("sensor")?,
            model_type: model_type.parse().map_err(anyhow::Error::msg)?,
            timestamp: row.try_get("timestamp")?,
            predictions,
        }))
    }

    async fn insert_reading(store: &PgStore, sensor: &str, ts: DateTime<Utc>, eco2: f64) -> Result<()> {
        sqlx::query(
            "INSERT INTO sensor_readings (sensor, ts, eco2, sound, color_r, color_g, color_b) VALUES ($1, $2, $3, 40, 10, 20, 30)",
        )
        .bind(sensor)
        .bind(ts)
        .bind(eco2)
        .execute(store.pool())
        .await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_buckets_fold_and_forecast_upsert() -> Result<()> {
        if env::var("FORECAST_INTEGRATION_TEST").ok().as_deref() != Some("1") {
            return Ok(());
        }
        let database_url = match env::var("FORECAST_TEST_DATABASE_URL") {
            Ok(value) => value,
            Err(_) => return Ok(()),
        };

        let schema = format!("forecast_test_{}", std::process::id());
        let store = setup_test_store(&database_url, &schema).await?;

        let now = Utc.with_ymd_and_hms(2024, 3, 6, 14, 37, 0).unwrap();
        for hour in 7..13 {
            let ts = Utc.with_ymd_and_hms(2024, 3, 6, hour, 15, 0).unwrap();
            insert_reading(&store, "thingy001", ts, 400.0 + hour as f64).await?;
            insert_reading(&store, "thingy001", ts + Duration::minutes(30), 410.0 + hour as f64).await?;
        }
        // running hour: only visible to the live window, folded into 12:00
        insert_reading(&store, "thingy001", Utc.with_ymd_and_hms(2024, 3, 6, 13, 20, 0).unwrap(), 900.0).await?;

        let hist = store
            .hourly_buckets("thingy001", &QueryWindow::at(&now, WindowMode::Hist))
            .await?;
        assert_eq!(hist.len(), 6);
        assert_eq!(hist[0].bucket_start, Utc.with_ymd_and_hms(2024, 3, 6, 7, 0, 0).unwrap());
        assert_eq!(hist[0].eco2, 412.0);
        assert_eq!(hist[5].eco2, 417.0);

        let live = store
            .hourly_buckets("thingy001", &QueryWindow::at(&now, WindowMode::Live))
            .await?;
        assert_eq!(live.len(), 6);
        assert!((live[5].eco2 - (412.0 + 422.0 + 900.0) / 3.0).abs() < 1e-9);

        let mut document = ForecastDocument {
            sensor: "thingy001".to_string(),
            model_type: ModelVariant::Gru,
            timestamp: "2024-03-06T14:37:00".to_string(),
            predictions: vec![ForecastEntry {
                timestamp: "2024-03-06T14:00:00".to_string(),
                co2_level: 550,
                light_level: 100,
                sound_level: 40,
                color_code: ColorCode::Green,
            }],
        };
        store.upsert_forecast(&document).await?;
        document.predictions[0].color_code = ColorCode::Red;
        store.upsert_forecast(&document).await?;

        let stored = fetch_forecast(&store, "thingy001", ModelVariant::Gru).await?;
        assert_eq!(stored, Some(document));
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM forecasts")
            .fetch_one(store.pool())
            .await?;
        assert_eq!(count, 1);

        sqlx::query(&format!("DROP SCHEMA {} CASCADE", schema))
            .execute(store.pool())
            .await?;
        Ok(())
    }
}
