use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;

use crate::audio;
use crate::config::DetectorConfig;
use crate::error::DetectorError;
use crate::providers::{AudioUpload, PredictionProvider, TranscriptStatus, TranscriptionProvider};
use crate::state::{AudioSelection, FormState, Prediction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Predict,
    Transcribe,
}

/// Clears the in-flight flag of a flow when the flow ends, whichever way it ends.
struct FlowGuard {
    state: Arc<Mutex<FormState>>,
    flow: Flow,
}

impl Drop for FlowGuard {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        match self.flow {
            Flow::Predict => state.set_loading(false),
            Flow::Transcribe => state.set_transcribing(false),
        }
    }
}

fn lock(state: &Mutex<FormState>) -> MutexGuard<'_, FormState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Drives the predict and transcribe flows and keeps the form state in step
/// with their outcomes.
///
/// Only one flow runs at a time. `shutdown` cancels whatever is in flight;
/// `clear` makes the outcome of anything in flight stale.
pub struct Detector {
    config: DetectorConfig,
    predictor: Option<Arc<dyn PredictionProvider>>,
    transcriber: Option<Arc<dyn TranscriptionProvider>>,
    state: Arc<Mutex<FormState>>,
    cancel: CancellationToken,
}

impl Detector {
    pub fn new(config: DetectorConfig) -> Self {
        let state = FormState::new(config.max_text_chars);
        Self {
            config,
            predictor: None,
            transcriber: None,
            state: Arc::new(Mutex::new(state)),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_predictor(mut self, predictor: Arc<dyn PredictionProvider>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn TranscriptionProvider>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Copy of the current form state for rendering.
    pub fn snapshot(&self) -> FormState {
        lock(&self.state).clone()
    }

    pub fn set_text(&self, text: &str) {
        lock(&self.state).set_text(text);
    }

    pub fn clear(&self) {
        lock(&self.state).clear();
        tracing::debug!("form cleared");
    }

    /// Tears the detector down: in-flight requests are abandoned and every
    /// later flow returns `Cancelled` without touching the form.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once `shutdown` has been called.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Sends the current input to the prediction endpoint.
    pub async fn submit(&self) -> Result<Prediction, DetectorError> {
        let Some(predictor) = self.predictor.clone() else {
            return Err(self.reject(DetectorError::NotConfigured("Prediction endpoint")));
        };
        let (_guard, generation) = self.begin(Flow::Predict)?;
        let text = lock(&self.state).text().to_string();

        tracing::debug!(provider = predictor.name(), "submitting text for prediction");
        let outcome = match self.cancellable(predictor.predict(&text)).await {
            Ok(Ok(prediction)) => {
                tracing::info!(
                    label = %prediction.label,
                    confidence = prediction.confidence,
                    "prediction received"
                );
                Ok(prediction)
            }
            Ok(Err(err)) => {
                tracing::error!("Prediction request failed: {:#}", err);
                Err(DetectorError::Prediction)
            }
            Err(err) => Err(err),
        };

        self.settle(generation, outcome, |state, prediction| {
            state.set_result(prediction.clone())
        })
    }

    /// Validates an audio file and makes it the current selection.
    ///
    /// The previous selection is dropped whether or not the new one is accepted.
    pub async fn select_audio(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<AudioSelection, DetectorError> {
        if self.cancel.is_cancelled() {
            return Err(DetectorError::Cancelled);
        }
        let path = path.as_ref().to_path_buf();
        let mime = audio::mime_for_path(&path);

        if !audio::is_audio_mime(mime) {
            tracing::warn!(path = %path.display(), mime, "rejected non-audio file");
            return Err(self.reject_selection(DetectorError::InvalidAudioType {
                mime: mime.to_string(),
            }));
        }

        let audio_path = path.clone();
        let measured = self
            .cancellable(tokio::task::spawn_blocking(move || {
                let duration = audio::read_duration(&audio_path)?;
                let size = std::fs::metadata(&audio_path)?.len();
                Ok::<_, anyhow::Error>((duration, size))
            }))
            .await?;

        let (duration, size) = match measured {
            Ok(Ok(measured)) => measured,
            Ok(Err(err)) => {
                tracing::error!(path = %path.display(), "Failed to read audio duration: {:#}", err);
                return Err(self.reject_selection(DetectorError::AudioUnreadable));
            }
            Err(err) => {
                tracing::error!(path = %path.display(), "Audio duration task panicked: {}", err);
                return Err(self.reject_selection(DetectorError::AudioUnreadable));
            }
        };

        if duration > self.config.max_audio_seconds {
            tracing::warn!(path = %path.display(), duration, "rejected audio over the length limit");
            return Err(self.reject_selection(DetectorError::AudioTooLong {
                duration,
                max_seconds: self.config.max_audio_seconds,
            }));
        }

        let selection = AudioSelection {
            path,
            mime: mime.to_string(),
            duration_seconds: duration,
            size_bytes: size,
        };
        tracing::debug!(path = %selection.path.display(), duration, "audio selected");
        let mut state = lock(&self.state);
        if self.cancel.is_cancelled() {
            return Err(DetectorError::Cancelled);
        }
        state.set_audio_selection(selection.clone());
        Ok(selection)
    }

    /// Uploads the selected audio, waits for the transcript and copies it
    /// into the input.
    pub async fn transcribe(&self) -> Result<String, DetectorError> {
        let Some(transcriber) = self.transcriber.clone() else {
            return Err(self.reject(DetectorError::NotConfigured("Transcription provider")));
        };
        if self.cancel.is_cancelled() {
            return Err(DetectorError::Cancelled);
        }
        let selection = {
            let state = lock(&self.state);
            if state.is_busy() {
                tracing::debug!("rejected transcription while another request is in flight");
                return Err(DetectorError::Busy);
            }
            state.audio_selection().cloned()
        };
        let Some(selection) = selection else {
            return Err(self.reject(DetectorError::NoAudioSelected));
        };
        let (_guard, generation) = self.begin(Flow::Transcribe)?;

        let outcome = self.run_transcription(transcriber.as_ref(), &selection).await;
        self.settle(generation, outcome, |state, text| state.set_transcription(text))
    }

    /// Transcribes the selected audio, then submits the transcript for prediction.
    pub async fn transcribe_and_submit(&self) -> Result<Prediction, DetectorError> {
        self.transcribe().await?;
        self.submit().await
    }

    async fn run_transcription(
        &self,
        transcriber: &dyn TranscriptionProvider,
        selection: &AudioSelection,
    ) -> Result<String, DetectorError> {
        let data = self
            .cancellable(tokio::fs::read(&selection.path))
            .await?
            .map_err(|err| {
                tracing::error!(path = %selection.path.display(), "Failed to read audio: {}", err);
                DetectorError::AudioUnreadable
            })?;
        let file_name = selection
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("audio")
            .to_string();

        tracing::debug!(provider = transcriber.name(), bytes = data.len(), "uploading audio");
        let upload = AudioUpload {
            file_name,
            mime: selection.mime.clone(),
            data,
        };
        let upload_url = self
            .cancellable(transcriber.upload(upload))
            .await?
            .map_err(|err| {
                tracing::error!("Audio upload failed: {:#}", err);
                DetectorError::Upload
            })?;

        let id = self
            .cancellable(transcriber.request_transcript(&upload_url))
            .await?
            .map_err(|err| {
                tracing::error!("Transcript request failed: {:#}", err);
                DetectorError::TranscriptRequest
            })?;
        tracing::debug!(id = %id, "transcription job created");

        let max_attempts = self.config.max_poll_attempts;
        for attempt in 1..=max_attempts {
            let job = self
                .cancellable(transcriber.transcript_status(&id))
                .await?
                .map_err(|err| {
                    tracing::error!(id = %id, "Transcript status request failed: {:#}", err);
                    DetectorError::TranscriptionFailed
                })?;

            match job.status {
                TranscriptStatus::Completed => {
                    tracing::info!(id = %id, attempts = attempt, "transcription completed");
                    return Ok(job.text.unwrap_or_default());
                }
                TranscriptStatus::Error => {
                    tracing::error!(
                        id = %id,
                        reason = job.error.as_deref().unwrap_or("unknown"),
                        "Transcription job failed"
                    );
                    return Err(DetectorError::TranscriptionFailed);
                }
                TranscriptStatus::Queued | TranscriptStatus::Processing => {
                    tracing::debug!(id = %id, attempt, status = ?job.status, "transcription pending");
                }
            }

            if attempt < max_attempts {
                self.cancellable(tokio::time::sleep(self.config.poll_interval))
                    .await?;
            }
        }

        tracing::warn!(id = %id, attempts = max_attempts, "gave up waiting for transcription");
        Err(DetectorError::TranscriptionTimedOut)
    }

    fn begin(&self, flow: Flow) -> Result<(FlowGuard, u64), DetectorError> {
        if self.cancel.is_cancelled() {
            return Err(DetectorError::Cancelled);
        }

        let mut state = lock(&self.state);
        if state.is_busy() {
            tracing::debug!(?flow, "rejected while another request is in flight");
            return Err(DetectorError::Busy);
        }
        match flow {
            Flow::Predict => state.set_loading(true),
            Flow::Transcribe => state.set_transcribing(true),
        }
        state.clear_outcome();

        let guard = FlowGuard {
            state: Arc::clone(&self.state),
            flow,
        };
        Ok((guard, state.generation()))
    }

    /// Applies a finished flow to the form, unless the form was cleared since
    /// the flow started or the detector was shut down.
    fn settle<T>(
        &self,
        generation: u64,
        outcome: Result<T, DetectorError>,
        apply: impl FnOnce(&mut FormState, &T),
    ) -> Result<T, DetectorError> {
        if matches!(outcome, Err(DetectorError::Cancelled)) || self.cancel.is_cancelled() {
            return Err(DetectorError::Cancelled);
        }

        let mut state = lock(&self.state);
        if state.generation() != generation {
            tracing::debug!("discarding outcome of a flow started before the form was cleared");
            return Err(DetectorError::Stale);
        }

        match &outcome {
            Ok(value) => apply(&mut *state, value),
            Err(err) if err.is_displayed() => state.set_error(err.to_string()),
            Err(_) => {}
        }
        outcome
    }

    fn reject(&self, err: DetectorError) -> DetectorError {
        if err.is_displayed() && !self.cancel.is_cancelled() {
            lock(&self.state).set_error(err.to_string());
        }
        err
    }

    fn reject_selection(&self, err: DetectorError) -> DetectorError {
        if self.cancel.is_cancelled() {
            return DetectorError::Cancelled;
        }
        let mut state = lock(&self.state);
        state.clear_audio_selection();
        state.set_error(err.to_string());
        err
    }

    async fn cancellable<F: Future>(&self, future: F) -> Result<F::Output, DetectorError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DetectorError::Cancelled),
            output = future => Ok(output),
        }
    }
}
