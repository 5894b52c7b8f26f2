use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::PredictionProvider;
use crate::state::Prediction;

#[derive(Serialize)]
struct PredictRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct PredictResponse {
    prediction: String,
    confidence: f64,
}

/// Client for the `/predict` classification endpoint.
pub struct PredictApiProvider {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl PredictApiProvider {
    pub fn new(url: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            timeout,
        }
    }
}

#[async_trait]
impl PredictionProvider for PredictApiProvider {
    fn name(&self) -> &str {
        "Prediction API"
    }

    async fn predict(&self, text: &str) -> Result<Prediction> {
        tracing::debug!(url = %self.url, chars = text.chars().count(), "sending predict request");
        let response = self
            .client
            .post(&self.url)
            .json(&PredictRequest { text })
            .timeout(self.timeout)
            .send()
            .await
            .context("Failed to send request to prediction API")?;

        tracing::debug!(status = %response.status(), "prediction API responded");
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, error_text);
        }

        let body: PredictResponse = response
            .json()
            .await
            .context("Failed to parse prediction response as JSON")?;

        Ok(Prediction::new(body.prediction, body.confidence))
    }
}
