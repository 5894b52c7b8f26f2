use thiserror::Error;

/// Failures surfaced to the user. The `Display` text is what ends up in the
/// error region of the form; the underlying cause is only logged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectorError {
    #[error("Please select a valid audio file.")]
    InvalidAudioType { mime: String },

    #[error("Audio must be {max_seconds} seconds or shorter.")]
    AudioTooLong { duration: f64, max_seconds: f64 },

    #[error("Could not read audio file.")]
    AudioUnreadable,

    #[error("Please select an audio file first.")]
    NoAudioSelected,

    #[error("{0} is not configured.")]
    NotConfigured(&'static str),

    #[error("Another request is already in progress.")]
    Busy,

    #[error("There was an issue with the server request.")]
    Prediction,

    #[error("Failed to upload audio")]
    Upload,

    #[error("Failed to request transcription")]
    TranscriptRequest,

    #[error("Transcription failed")]
    TranscriptionFailed,

    #[error("Transcription timed out")]
    TranscriptionTimedOut,

    #[error("Request cancelled")]
    Cancelled,

    #[error("Result discarded because the form was cleared")]
    Stale,
}

impl DetectorError {
    /// Whether this error is written into the form's error region.
    ///
    /// A busy rejection only happens when the trigger should have been
    /// disabled, a cancelled flow has no view left to update, and a stale
    /// outcome belongs to a form that was since cleared.
    pub fn is_displayed(&self) -> bool {
        !matches!(
            self,
            DetectorError::Busy | DetectorError::Cancelled | DetectorError::Stale
        )
    }
}
