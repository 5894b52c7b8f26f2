use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt};
use tracing_subscriber::EnvFilter;

use hatespeech_detector::config::{
    Config, DetectorConfig, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_TRANSCRIPTION_URL,
};
use hatespeech_detector::providers::assemblyai::AssemblyAiProvider;
use hatespeech_detector::providers::predict_api::PredictApiProvider;
use hatespeech_detector::{view, Detector, DetectorError};

#[derive(Parser)]
#[command(author, version, about = "Hate speech detection for text and short audio clips", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Prediction endpoint (overrides HATESPEECH_PREDICT_URL environment variable)
    #[arg(long, global = true)]
    predict_url: Option<String>,

    /// Transcription API base URL (overrides ASSEMBLYAI_BASE_URL environment variable)
    #[arg(long, global = true)]
    transcription_url: Option<String>,

    /// AssemblyAI API key (overrides ASSEMBLYAI_API_KEY environment variable)
    #[arg(long, global = true)]
    assemblyai_api_key: Option<String>,

    /// Seconds between transcription status checks
    #[arg(long, global = true, default_value_t = 5)]
    poll_interval_secs: u64,

    /// Status checks before a transcription is given up on
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_POLL_ATTEMPTS)]
    max_poll_attempts: u32,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = 60)]
    timeout_secs: u64,

    /// Log requests and polling to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Classify TEXT, or standard input when TEXT is omitted
    Predict { text: Option<String> },

    /// Transcribe an audio clip of up to 20 seconds
    Transcribe {
        file: PathBuf,

        /// Classify the transcript once it arrives
        #[arg(long)]
        detect: bool,
    },

    /// Interactive form: type text to classify it, /help for commands
    Form,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn env_or(flag: &Option<String>, var: &str) -> Option<String> {
    flag.clone().or_else(|| env::var(var).ok())
}

fn build_config(args: &Args) -> Result<Config> {
    let config = Config {
        predict_url: env_or(&args.predict_url, "HATESPEECH_PREDICT_URL"),
        transcription_url: env_or(&args.transcription_url, "ASSEMBLYAI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_TRANSCRIPTION_URL.to_string()),
        assemblyai_api_key: env_or(&args.assemblyai_api_key, "ASSEMBLYAI_API_KEY"),
        request_timeout: Duration::from_secs(args.timeout_secs),
        detector: DetectorConfig {
            poll_interval: Duration::from_secs(args.poll_interval_secs),
            max_poll_attempts: args.max_poll_attempts,
            ..DetectorConfig::default()
        },
    };
    config.validate()?;
    Ok(config)
}

fn build_detector(config: &Config, need_predict: bool, need_transcribe: bool) -> Result<Detector> {
    let mut detector = Detector::new(config.detector.clone());

    match &config.predict_url {
        Some(url) => {
            detector = detector.with_predictor(Arc::new(PredictApiProvider::new(
                url.clone(),
                config.request_timeout,
            )));
        }
        None if need_predict => anyhow::bail!(
            "HATESPEECH_PREDICT_URL environment variable not set or --predict-url not provided"
        ),
        None => {}
    }

    match &config.assemblyai_api_key {
        Some(key) => {
            detector = detector.with_transcriber(Arc::new(AssemblyAiProvider::new(
                config.transcription_url.clone(),
                key.clone(),
                config.request_timeout,
            )));
        }
        None if need_transcribe => anyhow::bail!(
            "ASSEMBLYAI_API_KEY environment variable not set or --assemblyai-api-key not provided"
        ),
        None => {}
    }

    Ok(detector)
}

/// Cancels in-flight requests on Ctrl-C.
fn spawn_ctrl_c_watcher(detector: Arc<Detector>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, cancelling...");
            detector.shutdown();
        }
    });
}

fn print_outcome(detector: &Detector) {
    print!("{}", view::render_outcome(&detector.snapshot()));
}

async fn run_predict(detector: &Detector, text: Option<String>) -> Result<bool> {
    let text = match text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Failed to read text from stdin")?;
            buf.trim_end().to_string()
        }
    };

    let limit = detector.config().max_text_chars;
    if text.chars().count() > limit {
        eprintln!("Input longer than {} characters, truncating.", limit);
    }
    detector.set_text(&text);
    println!("{}", view::counter(&detector.snapshot()));

    let ok = detector.submit().await.is_ok();
    print_outcome(detector);
    Ok(ok)
}

async fn run_transcribe(detector: &Detector, file: PathBuf, detect: bool) -> Result<bool> {
    let selection = match detector.select_audio(&file).await {
        Ok(selection) => selection,
        Err(_) => {
            print_outcome(detector);
            return Ok(false);
        }
    };
    println!(
        "Selected {} ({:.1}s, {:.1} KB)",
        selection.path.display(),
        selection.duration_seconds,
        selection.size_bytes as f64 / 1024.0
    );

    println!("Transcribing...");
    let ok = if detect {
        detector.transcribe_and_submit().await.is_ok()
    } else {
        detector.transcribe().await.is_ok()
    };

    let state = detector.snapshot();
    if let Some(text) = state.transcription() {
        println!();
        println!("Transcription:");
        println!("{}", text);
        println!();
    }
    print!("{}", view::render_outcome(&state));
    Ok(ok)
}

const FORM_HELP: &str = "\
Type a line of text to classify it. Commands:
  /audio <path>   select an audio clip
  /transcribe     transcribe the selected clip into the input
  /detect         classify the current input again
  /clear          reset input, result and error
  /show           redraw the form
  /quit           exit";

fn show_outcome<T>(detector: &Detector, outcome: Result<T, DetectorError>) {
    if let Err(DetectorError::Busy) = outcome {
        println!("Busy, wait for the current request to finish.");
    }
    print!("{}", view::render(&detector.snapshot()));
}

async fn run_form(detector: &Detector) -> Result<bool> {
    println!("{}", FORM_HELP);
    println!();
    print!("{}", view::render(&detector.snapshot()));

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = detector.cancelled() => break,
            line = lines.next_line() => line.context("Failed to read from stdin")?,
        };
        let Some(line) = line else { break };
        let line = line.trim();

        match line.split_once(' ').unwrap_or((line, "")) {
            ("", _) => continue,
            ("/quit", _) | ("/exit", _) => break,
            ("/help", _) => println!("{}", FORM_HELP),
            ("/show", _) => print!("{}", view::render(&detector.snapshot())),
            ("/clear", _) => {
                detector.clear();
                print!("{}", view::render(&detector.snapshot()));
            }
            ("/audio", path) if !path.trim().is_empty() => {
                let outcome = detector.select_audio(path.trim()).await;
                show_outcome(detector, outcome);
            }
            ("/audio", _) => println!("Usage: /audio <path>"),
            ("/transcribe", _) => {
                let outcome = detector.transcribe().await;
                show_outcome(detector, outcome);
            }
            ("/detect", _) => {
                let outcome = detector.submit().await;
                show_outcome(detector, outcome);
            }
            (command, _) if command.starts_with('/') => {
                println!("Unknown command {}, try /help", command);
            }
            _ => {
                detector.set_text(line);
                let outcome = detector.submit().await;
                show_outcome(detector, outcome);
            }
        }
    }

    Ok(true)
}

async fn main_async() -> Result<bool> {
    let args = Args::parse();

    if tokio::fs::try_exists(".env").await? {
        dotenvy::dotenv()?;
    }

    init_logging(args.verbose);
    let config = build_config(&args)?;

    let detector = match &args.command {
        Command::Predict { .. } => build_detector(&config, true, false)?,
        Command::Transcribe { detect, .. } => build_detector(&config, *detect, true)?,
        Command::Form => build_detector(&config, true, false)?,
    };
    let detector = Arc::new(detector);
    spawn_ctrl_c_watcher(Arc::clone(&detector));

    match args.command {
        Command::Predict { text } => run_predict(&detector, text).await,
        Command::Transcribe { file, detect } => run_transcribe(&detector, file, detect).await,
        Command::Form => run_form(&detector).await,
    }
}

fn main() -> ExitCode {
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("Failed to start runtime: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let result = rt.block_on(main_async());
    // stdin reads can keep a blocking thread alive; don't wait for it
    rt.shutdown_background();

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
