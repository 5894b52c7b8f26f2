use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::state::Prediction;

/// Classifies a piece of text.
#[async_trait]
pub trait PredictionProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn predict(&self, text: &str) -> Result<Prediction>;
}

/// Asynchronous speech-to-text service: upload, create a job, then poll it.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Uploads the audio and returns the URL the provider stored it under.
    async fn upload(&self, audio: AudioUpload) -> Result<String>;

    /// Starts a transcription job for previously uploaded audio and returns its id.
    async fn request_transcript(&self, audio_url: &str) -> Result<String>;

    async fn transcript_status(&self, id: &str) -> Result<TranscriptJob>;
}

/// Audio bytes ready to be sent as a multipart part.
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub file_name: String,
    pub mime: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

impl TranscriptStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TranscriptStatus::Completed | TranscriptStatus::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TranscriptJob {
    pub id: String,
    pub status: TranscriptStatus,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

pub const API_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);

pub mod assemblyai;
pub mod predict_api;
