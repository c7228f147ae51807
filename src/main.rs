use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use practice_audio::audio::{AudioBackendFactory, AudioFormat, AudioSource};
use practice_audio::cache::{AudioCache, DiskStore};
use practice_audio::config::expand_path;
use practice_audio::convert::{Converter, FfmpegEngine};
use practice_audio::pipeline::{PracticePipeline, QuestionContext};
use practice_audio::recording::{Recorder, Recording};
use practice_audio::session::{IdentificationPhoto, SessionStore};
use practice_audio::telegram::TelegramSender;
use practice_audio::tts::{CachedSpeech, StreamElementsTts};
use practice_audio::{create_router, AppState, Config};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "practice-audio")]
#[command(about = "Record, convert and deliver speaking practice answers")]
struct Args {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/practice-audio")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the local HTTP API
    Serve {
        /// WAV file to replay instead of the microphone
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Record an answer and save it (converted to MP3 when possible)
    Record {
        /// Recording length in seconds
        #[arg(short, long, default_value = "10")]
        seconds: u64,
        /// WAV file to replay instead of the microphone
        #[arg(long)]
        input: Option<PathBuf>,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: String,
        /// Output file name without extension
        #[arg(long, default_value = "recording")]
        name: String,
    },
    /// Send an audio file as the answer to a question
    Send {
        file: PathBuf,
        #[arg(short, long)]
        question: String,
        /// One-based question number
        #[arg(short, long)]
        number: usize,
        #[arg(long)]
        category: Option<String>,
    },
    /// Manage the student session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Speak text through the cached synthesizer
    Tts {
        text: Vec<String>,
        #[arg(short, long)]
        voice: Option<String>,
        /// Write the audio here instead of only warming the cache
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Inspect or clear the speech cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Identify the student and start a session
    Start {
        #[arg(short, long)]
        name: String,
        /// JPEG/PNG/WebP identification photo
        #[arg(short, long)]
        photo: PathBuf,
    },
    /// Show the current session
    Status,
    /// End the current session
    End,
}

#[derive(Subcommand)]
enum CacheAction {
    Stats,
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)
        .with_context(|| format!("Failed to load config {}", args.config))?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Serve { input } => serve(&cfg, input).await,
        Command::Record {
            seconds,
            input,
            out,
            name,
        } => record(&cfg, seconds, input, &out, &name).await,
        Command::Send {
            file,
            question,
            number,
            category,
        } => send(&cfg, &file, &question, number, category.as_deref()).await,
        Command::Session { action } => session(&cfg, action).await,
        Command::Tts { text, voice, out } => tts(&cfg, &text.join(" "), voice, out).await,
        Command::Cache { action } => cache(&cfg, action).await,
    }
}

fn build_recorder(cfg: &Config, input: Option<PathBuf>) -> Result<Recorder> {
    let source = match input {
        Some(path) => AudioSource::File(path),
        None => AudioSource::Microphone,
    };
    let backend = AudioBackendFactory::create(source, cfg.backend_config())?;
    Ok(Recorder::new(backend, cfg.backend_config()))
}

async fn build_converter(cfg: &Config) -> Result<Arc<Converter>> {
    let converter = if cfg.converter.enabled {
        Converter::new(Arc::new(FfmpegEngine::new(expand_path(&cfg.converter.ffmpeg_path))?))
    } else {
        Converter::passthrough()
    };
    converter.prepare().await;
    Ok(Arc::new(converter))
}

fn build_sender(cfg: &Config) -> Result<Option<Arc<TelegramSender>>> {
    match cfg.telegram() {
        Some(tg) => Ok(Some(Arc::new(TelegramSender::new(
            &tg.api_base,
            &tg.bot_token,
            &tg.chat_id,
        )?))),
        None => {
            warn!("Telegram is not configured; answers cannot be sent");
            Ok(None)
        }
    }
}

async fn build_pipeline(cfg: &Config) -> Result<PracticePipeline> {
    Ok(PracticePipeline::new(
        build_converter(cfg).await?,
        build_sender(cfg)?,
        Arc::new(SessionStore::new(cfg.session_config())),
    ))
}

fn build_cache(cfg: &Config) -> Result<Arc<AudioCache>> {
    let store = DiskStore::open(cfg.cache_dir())?;
    Ok(Arc::new(AudioCache::new(Arc::new(store))))
}

async fn serve(cfg: &Config, input: Option<PathBuf>) -> Result<()> {
    let recorder = build_recorder(cfg, input)?;
    let pipeline = Arc::new(build_pipeline(cfg).await?);
    let app = create_router(AppState::new(recorder, pipeline));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP API listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn record(
    cfg: &Config,
    seconds: u64,
    input: Option<PathBuf>,
    out: &str,
    name: &str,
) -> Result<()> {
    let mut recorder = build_recorder(cfg, input)?;
    let converter = build_converter(cfg).await?;

    recorder.initialize().await?;
    recorder.start().await?;
    info!("Recording for {} seconds on {}", seconds, recorder.backend_name());

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
        _ = tokio::signal::ctrl_c() => info!("Interrupted, stopping early"),
    }

    let Some(recording) = recorder.stop().await? else {
        bail!("Recorder stopped without a recording");
    };
    recorder.release();

    info!(
        "Captured {:.1}s ({} bytes)",
        recording.duration_ms as f64 / 1000.0,
        recording.size()
    );

    let (path, result) = converter.export(&recording, &expand_path(out), name).await?;
    info!("Saved {} as {}", path.display(), result.format);
    Ok(())
}

async fn send(
    cfg: &Config,
    file: &Path,
    question: &str,
    number: usize,
    category: Option<&str>,
) -> Result<()> {
    let pipeline = build_pipeline(cfg).await?;

    let format = file
        .extension()
        .and_then(|e| e.to_str())
        .and_then(AudioFormat::from_extension)
        .with_context(|| format!("Unrecognized audio file {}", file.display()))?;
    let payload = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let duration_ms = if format == AudioFormat::Wav {
        practice_audio::AudioFile::open(file)
            .map(|a| (a.duration_seconds * 1000.0) as u64)
            .unwrap_or(0)
    } else {
        0
    };

    let recording = Recording {
        payload,
        mime_type: format.mime_type().to_string(),
        duration_ms,
        created_at: chrono::Utc::now(),
    };

    let receipt = pipeline
        .submit_recording(&recording, &QuestionContext::new(question, number, category))
        .await?;

    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(())
}

async fn session(cfg: &Config, action: SessionAction) -> Result<()> {
    match action {
        SessionAction::Start { name, photo } => {
            let pipeline = build_pipeline(cfg).await?;
            let bytes = tokio::fs::read(&photo)
                .await
                .with_context(|| format!("Failed to read {}", photo.display()))?;
            let mime_type = match photo.extension().and_then(|e| e.to_str()) {
                Some("png") => "image/png",
                Some("webp") => "image/webp",
                _ => "image/jpeg",
            };
            let data_url = IdentificationPhoto {
                mime_type: mime_type.to_string(),
                bytes,
            }
            .to_data_url();

            let session = pipeline.start_session(&name, &data_url).await?;
            println!("Started {} for {}", session.session_id, session.name);
        }
        SessionAction::Status => {
            let store = SessionStore::new(cfg.session_config());
            let active = store.has_active_session().await;
            match store.get_session().await {
                Some(s) if active => println!(
                    "{} ({}), active for {}",
                    s.name,
                    s.session_id,
                    store.format_session_duration().await
                ),
                Some(s) => println!("{} ({}), expired", s.name, s.session_id),
                None => println!("No session"),
            }
        }
        SessionAction::End => {
            SessionStore::new(cfg.session_config()).clear_session().await?;
            println!("Session ended");
        }
    }
    Ok(())
}

async fn tts(cfg: &Config, text: &str, voice: Option<String>, out: Option<PathBuf>) -> Result<()> {
    if text.trim().is_empty() {
        bail!("Nothing to say");
    }

    let speech = CachedSpeech::new(
        Arc::new(StreamElementsTts::new(&cfg.tts.endpoint)),
        build_cache(cfg)?,
    );
    let voice = voice.unwrap_or_else(|| cfg.tts.default_voice.clone());
    let audio = speech.speak(text, &voice).await?;

    match out {
        Some(path) => {
            tokio::fs::write(&path, audio.as_slice())
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} bytes to {}", audio.len(), path.display());
        }
        None => info!("Cached {} bytes for {:?}", audio.len(), text),
    }
    Ok(())
}

async fn cache(cfg: &Config, action: CacheAction) -> Result<()> {
    let cache = build_cache(cfg)?;
    match action {
        CacheAction::Stats => {
            println!("{}", serde_json::to_string_pretty(&cache.stats().await)?);
        }
        CacheAction::Clear => {
            cache.clear().await;
            println!("Cache cleared");
        }
    }
    Ok(())
}
