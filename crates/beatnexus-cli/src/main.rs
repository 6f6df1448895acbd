//! BeatNexus CLI: probe, validate, compress and submit battle videos.
//!
//! Backend settings come from the environment (`SUPABASE_URL`,
//! `SUPABASE_ANON_KEY`, `SUPABASE_ACCESS_TOKEN`, ...) or a `.env` file.
//! Results are printed as JSON on stdout; progress and logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use beatnexus_core::{
    validate_video, BattleFormat, Config, ErrorMetadata, MediaFile, ValidationOutcome,
};
use beatnexus_services::{
    DurationProber, EventCallback, FlowEvent, MediaProbe, Preparation, SessionState, SubmissionError,
    SubmissionService, SubmissionSession, VideoFileValidator,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "beatnexus", about = "BeatNexus battle video submission CLI")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print ffprobe metadata for a video
    Probe {
        /// Path to the video
        file: PathBuf,
    },
    /// Check a video against a battle format
    Validate {
        file: PathBuf,
        /// MAIN_BATTLE, MINI_BATTLE or THEME_CHALLENGE
        #[arg(long)]
        format: BattleFormat,
    },
    /// Compress an oversized video until it fits under the upload cap
    Compress {
        file: PathBuf,
        /// Battle format the result must still satisfy
        #[arg(long, default_value = "THEME_CHALLENGE")]
        format: BattleFormat,
        /// Target size in MB for the first pass
        #[arg(long)]
        target_mb: Option<f64>,
        /// Directory for the compressed output
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Upload a video and create a battle submission
    Submit {
        file: PathBuf,
        /// Submitting user's id
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        format: BattleFormat,
        /// Fail instead of compressing an oversized video
        #[arg(long)]
        no_compress: bool,
    },
    /// Show the submission cooldown for a user
    Cooldown {
        #[arg(long)]
        user: Uuid,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

/// Cancel `token` on Ctrl-C
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling");
            token.cancel();
        }
    });
}

fn print_event(event: &FlowEvent) {
    match event {
        FlowEvent::Selected { file_name } => eprintln!("Selected {}", file_name),
        FlowEvent::Probing => eprintln!("Reading video..."),
        FlowEvent::Validated {
            duration_seconds,
            size_mb,
        } => eprintln!("Valid: {:.1}s, {:.1}MB", duration_seconds, size_mb),
        FlowEvent::CompressionOffered { message } => {
            eprintln!("{} Compressing...", message)
        }
        FlowEvent::Compressing(progress) => match progress.remaining_seconds {
            Some(secs) => eprintln!(
                "{} {}% (about {}s left)",
                progress.stage_label, progress.percent, secs
            ),
            None => eprintln!("{} {}%", progress.stage_label, progress.percent),
        },
        FlowEvent::CompressionPassFinished { pass, size_mb } => {
            eprintln!("Pass {} produced {:.1}MB", pass, size_mb)
        }
        FlowEvent::Uploading { size_mb } => eprintln!("Uploading {:.1}MB...", size_mb),
        FlowEvent::CreatingSubmission => eprintln!("Creating submission..."),
        FlowEvent::Matchmaking { submission_id } => {
            eprintln!("Submission {} created, finding an opponent...", submission_id)
        }
    }
}

fn print_events() -> EventCallback {
    Arc::new(|event| print_event(&event))
}

/// JSON body for a failed flow
#[derive(Serialize)]
struct ErrorReport {
    code: &'static str,
    message: String,
    recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggested_action: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cooldown: Option<beatnexus_core::CooldownState>,
}

impl From<&SubmissionError> for ErrorReport {
    fn from(err: &SubmissionError) -> Self {
        let cooldown = match err {
            SubmissionError::CooldownActive { state, .. } => Some(state.clone()),
            _ => None,
        };
        Self {
            code: err.error_code(),
            message: err.client_message(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action(),
            cooldown,
        }
    }
}

/// Print a flow error as JSON and exit non-zero
fn fail(err: SubmissionError) -> anyhow::Result<()> {
    print_json(&ErrorReport::from(&err))?;
    Err(anyhow::Error::new(err))
}

async fn load_service(config: &Config) -> anyhow::Result<SubmissionService> {
    SubmissionService::from_config(config)
        .await
        .context("Failed to initialize submission service")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    beatnexus_infra::init_telemetry(cli.json)
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    match cli.command {
        Commands::Probe { file } => {
            let prober = DurationProber::new(Config::ffprobe_path_from_env())?;
            let metadata = prober.probe_metadata(&file, &cancel).await?;
            print_json(&metadata)?;
        }
        Commands::Validate { file, format } => {
            let media = MediaFile::from_path(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            VideoFileValidator::default().validate_file(&media)?;

            let prober = DurationProber::new(Config::ffprobe_path_from_env())?;
            let probe = prober.probe(&media.path, &cancel).await?;
            let outcome = match validate_video(media, probe, format) {
                Ok(_) => ValidationOutcome::Ok,
                Err(rejected) => rejected,
            };
            print_json(&serde_json::json!({
                "format": format,
                "duration_seconds": probe.duration_seconds,
                "has_audio": probe.has_audio,
                "outcome": outcome,
                "compression_offered": outcome.offers_compression(),
            }))?;
        }
        Commands::Compress {
            file,
            format,
            target_mb,
            output,
        } => {
            let mut config = Config::from_env()?;
            if let Some(target_mb) = target_mb {
                config.compression_target_mb = target_mb;
            }
            if let Some(output) = output {
                config.work_dir = output;
            }
            config.validate()?;
            let service = load_service(&config).await?;

            let media = MediaFile::from_path(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let events = print_events();

            let original = match service.prepare(media, format, &events, &cancel).await {
                Ok(Preparation::Ready(validated)) => {
                    print_json(&serde_json::json!({
                        "compressed": false,
                        "file": validated.file(),
                    }))?;
                    return Ok(());
                }
                Ok(Preparation::CompressionOffered { original, .. }) => original,
                Err(e) => return fail(e),
            };

            match service.compress(&original, format, &events, &cancel).await {
                Ok(validated) => print_json(&serde_json::json!({
                    "compressed": true,
                    "original_mb": original.size_mb(),
                    "file": validated.file(),
                }))?,
                Err(e) => return fail(e),
            }
        }
        Commands::Submit {
            file,
            user,
            format,
            no_compress,
        } => {
            let config = Config::from_env()?;
            let service = Arc::new(load_service(&config).await?);
            let media = MediaFile::from_path(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;

            let session = SubmissionSession::new(service);
            let mut states = session.subscribe();
            let handle = session.start(media, user, format, !no_compress);

            let watcher = tokio::spawn(async move {
                while states.changed().await.is_ok() {
                    let state = states.borrow_and_update().clone();
                    match state {
                        SessionState::InProgress { event, .. } => print_event(&event),
                        state if state.is_terminal() => break,
                        _ => {}
                    }
                }
            });

            let result = tokio::select! {
                joined = handle => joined.context("Submission task failed")?,
                _ = cancel.cancelled() => {
                    session.cancel();
                    Err(SubmissionError::Cancelled)
                }
            };
            watcher.abort();

            match result {
                Ok(result) => print_json(&result)?,
                Err(e) => return fail(e),
            }
        }
        Commands::Cooldown { user } => {
            let config = Config::from_env()?;
            let service = load_service(&config).await?;
            match service.cooldown_status(user).await {
                Ok(state) => print_json(&serde_json::json!({
                    "can_submit": state.can_submit,
                    "remaining_minutes": state.remaining_minutes,
                    "last_submission_at": state.last_submission_at,
                    "message": state.message(),
                }))?,
                Err(e) => return fail(e),
            }
        }
    }

    Ok(())
}
