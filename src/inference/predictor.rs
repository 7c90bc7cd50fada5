use super::denormalize::check_shape;
use super::targets::HORIZON;
use super::window::WindowTensor;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelVariant {
    #[serde(rename = "LSTM")]
    Lstm,
    #[serde(rename = "GRU")]
    Gru,
    #[serde(rename = "CNN")]
    Cnn,
}

impl ModelVariant {
    pub const ALL: [ModelVariant; 3] = [ModelVariant::Lstm, ModelVariant::Gru, ModelVariant::Cnn];

    /// Value stored in the forecast document's `modelType`.
    pub fn as_str(self) -> &'static str {
        match self {
            ModelVariant::Lstm => "LSTM",
            ModelVariant::Gru => "GRU",
            ModelVariant::Cnn => "CNN",
        }
    }

    /// Model name on the serving endpoint.
    pub fn model_name(self) -> &'static str {
        match self {
            ModelVariant::Lstm => "lstm",
            ModelVariant::Gru => "gru",
            ModelVariant::Cnn => "cnn",
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelVariant {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lstm" => Ok(ModelVariant::Lstm),
            "gru" => Ok(ModelVariant::Gru),
            "cnn" => Ok(ModelVariant::Cnn),
            other => Err(format!("unknown model variant {other:?}")),
        }
    }
}

/// A trained sequence model: `(1, 6, F)` in, `(1, 3, F)` out. Implementations
/// return the single batch element as `HORIZON` rows of width `F`.
#[allow(async_fn_in_trait)]
pub trait Predictor {
    async fn predict(&self, variant: ModelVariant, window: &WindowTensor) -> Result<Vec<Vec<f64>>>;
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    instances: [&'a [Vec<f64>]; 1],
}

#[derive(Deserialize)]
struct PredictResponse {
    predictions: Vec<Vec<Vec<f64>>>,
}

/// Client for a model server exposing `POST {base}/v1/models/{name}:predict`.
#[derive(Clone)]
pub struct HttpPredictor {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpPredictor {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build model server client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn endpoint(&self, variant: ModelVariant) -> String {
        format!("{}/v1/models/{}:predict", self.base_url, variant.model_name())
    }
}

impl Predictor for HttpPredictor {
    async fn predict(&self, variant: ModelVariant, window: &WindowTensor) -> Result<Vec<Vec<f64>>> {
        let url = self.endpoint(variant);
        let payload = PredictRequest {
            instances: [window.rows.as_slice()],
        };
        let mut request = self.client.post(&url).json(&payload);
        if let Some(token) = self.token.as_deref() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("model server request to {url} failed"))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("model server returned {status} for {variant}: {body}");
        }
        let body: PredictResponse = response
            .json()
            .await
            .with_context(|| format!("invalid prediction payload from {url}"))?;

        let Some(rows) = body.predictions.into_iter().next() else {
            anyhow::bail!("model server returned no predictions for {variant}");
        };
        check_shape(&rows, HORIZON, window.width())?;
        Ok(rows)
    }
}
