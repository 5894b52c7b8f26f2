use std::path::PathBuf;

pub const DEFAULT_MAX_TEXT_CHARS: usize = 2000;

/// Label and confidence returned by the prediction endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    /// Always within `[0, 1]`.
    pub confidence: f64,
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            label: label.into(),
            confidence,
        }
    }

    /// Confidence as a percentage with two decimals, e.g. `87.00%`.
    pub fn confidence_percent(&self) -> String {
        format!("{:.2}%", self.confidence * 100.0)
    }
}

/// A validated audio file waiting to be transcribed.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSelection {
    pub path: PathBuf,
    pub mime: String,
    pub duration_seconds: f64,
    pub size_bytes: u64,
}

/// Everything the form displays. Result and error are mutually exclusive:
/// setting one clears the other.
#[derive(Debug, Clone)]
pub struct FormState {
    max_text_chars: usize,
    text: String,
    result: Option<Prediction>,
    error: Option<String>,
    loading: bool,
    transcribing: bool,
    audio: Option<AudioSelection>,
    transcription: Option<String>,
    generation: u64,
}

impl Default for FormState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TEXT_CHARS)
    }
}

impl FormState {
    pub fn new(max_text_chars: usize) -> Self {
        Self {
            max_text_chars,
            text: String::new(),
            result: None,
            error: None,
            loading: false,
            transcribing: false,
            audio: None,
            transcription: None,
            generation: 0,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn result(&self) -> Option<&Prediction> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_transcribing(&self) -> bool {
        self.transcribing
    }

    /// True while either flow is in flight.
    pub fn is_busy(&self) -> bool {
        self.loading || self.transcribing
    }

    pub fn audio_selection(&self) -> Option<&AudioSelection> {
        self.audio.as_ref()
    }

    pub fn transcription(&self) -> Option<&str> {
        self.transcription.as_deref()
    }

    pub fn max_text_chars(&self) -> usize {
        self.max_text_chars
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of characters in the input, as shown by the counter.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Replaces the input, truncating at the character limit.
    pub fn set_text(&mut self, text: &str) {
        self.text = truncate_chars(text, self.max_text_chars);
    }

    pub fn set_result(&mut self, prediction: Prediction) {
        self.error = None;
        self.result = Some(prediction);
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.result = None;
        self.error = Some(message.into());
    }

    /// Drops the previous outcome before a new request starts.
    pub fn clear_outcome(&mut self) {
        self.result = None;
        self.error = None;
    }

    /// Resets text, result and error together. Any flow started before this
    /// call will find the generation changed and discard its outcome.
    pub fn clear(&mut self) {
        self.text.clear();
        self.result = None;
        self.error = None;
        self.generation += 1;
    }

    pub fn set_audio_selection(&mut self, selection: AudioSelection) {
        self.audio = Some(selection);
        self.error = None;
    }

    pub fn clear_audio_selection(&mut self) {
        self.audio = None;
    }

    /// Stores a finished transcript and copies it into the input.
    pub fn set_transcription(&mut self, text: &str) {
        self.set_text(text);
        self.transcription = Some(text.to_string());
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub(crate) fn set_transcribing(&mut self, transcribing: bool) {
        self.transcribing = transcribing;
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
