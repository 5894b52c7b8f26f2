use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{AudioUpload, TranscriptJob, TranscriptionProvider};

#[derive(Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Serialize)]
struct TranscriptRequest<'a> {
    audio_url: &'a str,
}

#[derive(Deserialize)]
struct TranscriptCreated {
    id: String,
}

/// AssemblyAI-compatible transcription client (`/v2/upload`, `/v2/transcript`).
pub struct AssemblyAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl AssemblyAiProvider {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, error_text);
        }
        Ok(response)
    }
}

#[async_trait]
impl TranscriptionProvider for AssemblyAiProvider {
    fn name(&self) -> &str {
        "AssemblyAI"
    }

    async fn upload(&self, audio: AudioUpload) -> Result<String> {
        let size = audio.data.len();
        let file_part = reqwest::multipart::Part::bytes(audio.data)
            .file_name(audio.file_name)
            .mime_str(&audio.mime)?;
        let form = reqwest::multipart::Form::new().part("file", file_part);

        tracing::debug!(bytes = size, "uploading audio to {}", self.name());
        let response = self
            .client
            .post(self.endpoint("/v2/upload"))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .context("Failed to send upload request")?;
        let response = Self::check(response).await?;

        let body: UploadResponse = response
            .json()
            .await
            .context("Failed to parse upload response as JSON")?;
        Ok(body.upload_url)
    }

    async fn request_transcript(&self, audio_url: &str) -> Result<String> {
        tracing::debug!(audio_url, "requesting transcript");
        let response = self
            .client
            .post(self.endpoint("/v2/transcript"))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&TranscriptRequest { audio_url })
            .timeout(self.timeout)
            .send()
            .await
            .context("Failed to send transcript request")?;
        let response = Self::check(response).await?;

        let body: TranscriptCreated = response
            .json()
            .await
            .context("Failed to parse transcript response as JSON")?;
        Ok(body.id)
    }

    async fn transcript_status(&self, id: &str) -> Result<TranscriptJob> {
        let response = self
            .client
            .get(self.endpoint(&format!("/v2/transcript/{}", id)))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(self.timeout)
            .send()
            .await
            .context("Failed to send transcript status request")?;
        let response = Self::check(response).await?;

        response
            .json()
            .await
            .context("Failed to parse transcript status as JSON")
    }
}
