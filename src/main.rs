use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use voice_triage::service::backend::BackendClient;
use voice_triage::service::{Recording, TriageService};
use voice_triage::{EngineConfig, Language, QuestionnaireAnswers, TriageEngine, TriageRequest};

/// Emergency voice triage from acoustic features, speech signals and a
/// health questionnaire
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the engine config file (defaults to ~/.voice-triage/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assess a triage request (JSON) and print the result
    Assess {
        /// Path to the request JSON
        request: PathBuf,

        /// Questionnaire answers JSON, scored and attached to the request
        #[arg(short, long)]
        questionnaire: Option<PathBuf>,

        /// Pretty-print the result
        #[arg(long)]
        pretty: bool,
    },

    /// Send a WAV recording to the analysis backend and triage it
    Analyze {
        /// Path to the WAV recording
        audio: PathBuf,

        /// Analysis backend URL (defaults to the configured one)
        #[arg(short, long)]
        backend: Option<String>,

        /// Language code ("en" or "ar")
        #[arg(short, long, default_value = "en")]
        language: String,

        /// Questionnaire answers JSON
        #[arg(short, long)]
        questionnaire: Option<PathBuf>,

        /// Skip the speech-to-text path
        #[arg(long)]
        no_speech: bool,
    },

    /// Word error rate of a transcript against the screening phrase
    Wer {
        /// Transcript text
        transcript: String,

        /// Language code ("en" or "ar")
        #[arg(short, long, default_value = "en")]
        language: String,
    },

    /// Manage the engine config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write the default config, refusing to overwrite unless --force
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Print the effective config
    Show,
}

fn config_path(args: &Args) -> Result<PathBuf> {
    match &args.config {
        Some(path) => Ok(path.clone()),
        None => EngineConfig::default_config_path(),
    }
}

fn load_answers(path: &Path) -> Result<QuestionnaireAnswers> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read questionnaire {:?}", path))?;
    serde_json::from_str(&content)
        .context("Failed to parse questionnaire answers")
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("Failed to serialize output")?;
    println!("{}", output);
    Ok(())
}

fn assess(
    config: EngineConfig,
    request_path: &Path,
    questionnaire: Option<&Path>,
    pretty: bool,
) -> Result<()> {
    let content = std::fs::read_to_string(request_path)
        .with_context(|| format!("Failed to read request {:?}", request_path))?;
    let mut request: TriageRequest = serde_json::from_str(&content)
        .context("Failed to parse triage request")?;

    if let Some(path) = questionnaire {
        let scored = load_answers(path)?.score();
        debug!("Questionnaire score {} ({:?})", scored.total_score, scored.risk_level);
        request.questionnaire = Some(scored.summary());
    }

    let validated = request.validate().context("Invalid triage request")?;
    let result = TriageEngine::new(config).assess(&validated);
    print_json(&result, pretty)
}

async fn analyze(
    config: EngineConfig,
    audio: &Path,
    backend: Option<&str>,
    language: Language,
    questionnaire: Option<&Path>,
    no_speech: bool,
) -> Result<()> {
    let bytes =
        std::fs::read(audio).with_context(|| format!("Failed to read audio {:?}", audio))?;
    let file_name = audio
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "recording.wav".to_string());
    let recording = Recording::from_wav(bytes, file_name)?;

    let url = backend.unwrap_or(&config.service.backend_url).to_string();
    let client = Arc::new(BackendClient::new(&url)?);
    let health = client
        .check_health()
        .await
        .with_context(|| format!("Analysis backend at {} is not reachable", url))?;
    info!("Backend {} is {}", url, health.status);

    let summary = match questionnaire {
        Some(path) => Some(load_answers(path)?.score().summary()),
        None => None,
    };

    let recognizer: Option<Arc<dyn voice_triage::service::SpeechRecognizer>> = if no_speech {
        None
    } else {
        Some(client.clone())
    };
    let service = TriageService::new(TriageEngine::new(config), client, recognizer);
    let report = service.triage(&recording, language, summary).await?;
    print_json(&report, true)
}

fn wer(config: &EngineConfig, transcript: &str, language: Language) -> Result<()> {
    let result = config.word_error.evaluate(transcript, language);
    println!("Expected:   {}", result.expected_phrase);
    println!("Transcript: {}", result.normalized_transcript);
    println!(
        "WER {:.1}% ({} substitutions, {} insertions, {} deletions), severity {}",
        result.wer * 100.0,
        result.substitutions,
        result.insertions,
        result.deletions,
        result.severity.label()
    );
    Ok(())
}

fn config_command(path: &Path, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!("Config file {:?} already exists (use --force to overwrite)", path);
            }
            EngineConfig::default().save(path)?;
            println!("Wrote default config to {:?}", path);
        }
        ConfigAction::Show => {
            let config = EngineConfig::load(path)?;
            print_json(&config, true)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = config_path(&args)?;
    if let Command::Config { action } = &args.command {
        return config_command(&path, action);
    }

    let config = EngineConfig::load(&path)?;
    debug!("Loaded config from {:?} ({})", path, config.threshold_version);

    match &args.command {
        Command::Assess {
            request,
            questionnaire,
            pretty,
        } => assess(config, request, questionnaire.as_deref(), *pretty),
        Command::Analyze {
            audio,
            backend,
            language,
            questionnaire,
            no_speech,
        } => {
            analyze(
                config,
                audio,
                backend.as_deref(),
                Language::from_code(language),
                questionnaire.as_deref(),
                *no_speech,
            )
            .await
        }
        Command::Wer {
            transcript,
            language,
        } => wer(&config, transcript, Language::from_code(language)),
        Command::Config { .. } => Ok(()),
    }
}
