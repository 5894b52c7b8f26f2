use crate::state::FormState;

pub fn submit_caption(state: &FormState) -> &'static str {
    if state.is_loading() {
        "Detecting..."
    } else {
        "Detect Hate Speech"
    }
}

pub fn transcribe_caption(state: &FormState) -> &'static str {
    if state.is_transcribing() {
        "Transcribing..."
    } else {
        "Transcribe"
    }
}

/// `Limit 12/2000`
pub fn counter(state: &FormState) -> String {
    format!("Limit {}/{}", state.char_count(), state.max_text_chars())
}

/// The result/error region below the form. Empty when there is nothing to show.
pub fn render_outcome(state: &FormState) -> String {
    let mut out = String::new();
    if let Some(error) = state.error() {
        out.push_str(&format!("Error: {}\n", error));
    }
    if let Some(result) = state.result() {
        out.push_str(&format!("{}\n", result.label));
        out.push_str(&format!("Confidence: {}\n", result.confidence_percent()));
    }
    out
}

/// Full form: counter, input, selected audio, buttons and outcome.
pub fn render(state: &FormState) -> String {
    let mut out = format!("{}\n", counter(state));
    if !state.text().is_empty() {
        out.push_str(&format!("> {}\n", state.text()));
    }
    if let Some(audio) = state.audio_selection() {
        out.push_str(&format!(
            "Audio: {} ({:.1}s, {})\n",
            audio.path.display(),
            audio.duration_seconds,
            audio.mime
        ));
    }
    out.push_str(&format!(
        "[{}] [Clear] [{}]\n",
        submit_caption(state),
        transcribe_caption(state)
    ));
    out.push_str(&render_outcome(state));
    out
}
