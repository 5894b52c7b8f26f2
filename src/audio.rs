use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Guesses a MIME type from the file extension, the way a file picker would.
pub fn mime_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match extension.as_str() {
        "wav" | "wave" => "audio/wav",
        "mp3" => "audio/mpeg",
        "ogg" | "oga" => "audio/ogg",
        "opus" => "audio/opus",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "weba" => "audio/webm",
        "aif" | "aiff" => "audio/aiff",
        "webm" => "video/webm",
        "mp4" => "video/mp4",
        "txt" | "text" => "text/plain",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

pub fn is_audio_mime(mime: &str) -> bool {
    mime.starts_with("audio/")
}

/// Reads the playback duration of an audio file in seconds.
///
/// WAV goes through `hound`; every other container is read with `symphonia`.
/// The file handle is released before returning.
pub fn read_duration(path: &Path) -> Result<f64> {
    if mime_for_path(path) == "audio/wav" {
        return wav_duration(path);
    }
    container_duration(path)
}

fn wav_duration(path: &Path) -> Result<f64> {
    let reader = hound::WavReader::open(path).context("Failed to parse WAV file")?;
    let sample_rate = reader.spec().sample_rate;
    if sample_rate == 0 {
        anyhow::bail!("WAV file reports a sample rate of zero");
    }
    Ok(reader.duration() as f64 / sample_rate as f64)
}

fn container_duration(path: &Path) -> Result<f64> {
    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let file = File::open(path).context("Failed to open audio file")?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let opened = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("Unrecognised audio container")?;
    let mut format = opened.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .context("No audio track found")?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    if let (Some(time_base), Some(n_frames)) = (params.time_base, params.n_frames) {
        let time = time_base.calc_time(n_frames);
        return Ok(time.seconds as f64 + time.frac);
    }

    let sample_rate = params
        .sample_rate
        .context("Audio track has no sample rate")?;

    // Header carries no frame count: walk the packets and add up their durations.
    let mut frames: u64 = 0;
    loop {
        match format.next_packet() {
            Ok(packet) => {
                if packet.track_id() == track_id {
                    frames += packet.dur();
                }
            }
            Err(err) if is_end_of_stream(&err) => break,
            Err(err) => return Err(err).context("Failed to read audio packets"),
        }
    }

    match params.time_base {
        Some(time_base) => {
            let time = time_base.calc_time(frames);
            Ok(time.seconds as f64 + time.frac)
        }
        None => Ok(frames as f64 / sample_rate as f64),
    }
}

/// Symphonia signals the end of a stream with an `UnexpectedEof` I/O error.
fn is_end_of_stream(err: &symphonia::core::errors::Error) -> bool {
    matches!(
        err,
        symphonia::core::errors::Error::IoError(io) if io.kind() == std::io::ErrorKind::UnexpectedEof
    )
}
