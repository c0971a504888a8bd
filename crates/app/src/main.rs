use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use clap::{Parser, Subcommand};
use piano_transcriber_core::{
    format_time, AppConfig, AudioDecoder, AudioSink, DecodedAudio, JsonExportSink, LoadOutcome,
    MockTranscriber, NoteOn, PageOrientation, Pitch, PlaybackEvent, PlaybackStatus,
    SystemTimeSource, Transcriber, TranscriberError, Transcription, TranscriptionSession,
    WavDecoder,
};
use tracing_subscriber::EnvFilter;

fn main() -> piano_transcriber_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Transcribe { input, output } => run_transcribe(&input, output.as_deref()),
        Commands::Encode { input, output } => run_encode(&config, &input, output.as_deref()),
        Commands::Play {
            input,
            volume,
            seek,
        } => run_play(&config, &input, volume, seek),
        Commands::Export {
            input,
            orientation,
            width_mm,
            output,
        } => {
            let mut config = config;
            if let Some(orientation) = orientation {
                config.export.orientation = orientation;
            }
            if let Some(width_mm) = width_mm {
                config.export.page_width_mm = width_mm;
            }
            run_export(&config, &input, output.as_deref())
        }
    }
}

fn run_transcribe(input: &Path, output: Option<&Path>) -> piano_transcriber_core::Result<()> {
    tracing::info!(?input, "transcribing audio file");

    let decoded = WavDecoder.decode(&fs::read(input)?)?;
    let transcription = MockTranscriber.transcribe(&decoded, file_name(input))?;
    tracing::info!(
        title = %transcription.song_title,
        notes = transcription.notes.len(),
        duration = %format_time(transcription.duration),
        "transcription complete"
    );

    write_output(output, &transcription.to_json_pretty()?)
}

fn run_encode(
    config: &AppConfig,
    input: &Path,
    output: Option<&Path>,
) -> piano_transcriber_core::Result<()> {
    let session = load_session(config, input)?;
    let score = session
        .encode()
        .ok_or_else(|| TranscriberError::msg("no song loaded"))?;

    for warning in &score.warnings {
        tracing::warn!(index = warning.index, pitch = %warning.pitch, "pitch replaced by default");
    }

    write_output(output, &score.to_abc())
}

fn run_play(
    config: &AppConfig,
    input: &Path,
    volume: Option<f64>,
    seek: Option<f64>,
) -> piano_transcriber_core::Result<()> {
    let mut session = load_session(config, input)?;
    let clock = session.clock_mut();

    if let Some(volume) = volume {
        clock.set_volume(volume)?;
    }
    if let Some(seek) = seek {
        clock.seek(seek)?;
    }

    tracing::info!(
        duration = %format_time(clock.duration()),
        volume = clock.volume_percent(),
        "starting playback"
    );
    clock.play()?;

    let interval = Duration::from_millis(config.playback.tick_interval_ms.max(1));
    while clock.status() == PlaybackStatus::Playing {
        thread::sleep(interval);
        for event in clock.tick() {
            match event {
                PlaybackEvent::Ended => tracing::info!("playback finished"),
                PlaybackEvent::Error(message) => {
                    return Err(TranscriberError::Playback(message));
                }
                PlaybackEvent::TimeChanged(t) => tracing::debug!(time = %format_time(t), "tick"),
                _ => {}
            }
        }
    }

    Ok(())
}

fn run_export(
    config: &AppConfig,
    input: &Path,
    output: Option<&Path>,
) -> piano_transcriber_core::Result<()> {
    let session = load_session(config, input)?;
    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(fs::File::create(path)?),
        None => Box::new(io::stdout()),
    };

    let mut sink = JsonExportSink::new(writer);
    if !session.export(&mut sink)? {
        return Err(TranscriberError::msg("no song loaded"));
    }
    sink.into_inner().flush()?;
    Ok(())
}

fn load_session(
    config: &AppConfig,
    input: &Path,
) -> piano_transcriber_core::Result<TranscriptionSession<LoggingSink, SystemTimeSource>> {
    let mut session = TranscriptionSession::new(LoggingSink, SystemTimeSource::new(), config)?;

    let outcome = if is_wav(input) {
        let ticket = session.begin_load();
        let decoded = fs::read(input)
            .map_err(TranscriberError::from)
            .and_then(|bytes| WavDecoder.decode(&bytes));
        session.finish_load(ticket, decoded, &MockTranscriber, file_name(input))?
    } else {
        let raw = fs::read_to_string(input)?;
        session.load_transcription(Transcription::from_json_str(&raw)?)?
    };

    match outcome {
        LoadOutcome::Applied { notes, .. } => tracing::debug!(?input, notes, "song loaded"),
        LoadOutcome::Stale { .. } => return Err(TranscriberError::msg("load superseded")),
    }
    Ok(session)
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
}

fn file_name(path: &Path) -> &str {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
}

fn write_output(output: Option<&Path>, contents: &str) -> piano_transcriber_core::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, contents)?;
            tracing::info!(?path, "wrote output");
        }
        None => println!("{contents}"),
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

/// Sink without a backing track that reports each note through `tracing`.
#[derive(Debug, Default)]
struct LoggingSink;

impl AudioSink for LoggingSink {
    fn is_ready(&self) -> bool {
        true
    }

    fn load_buffer(&mut self, audio: &DecodedAudio) {
        tracing::debug!(
            sample_rate = audio.sample_rate,
            duration = audio.duration_seconds(),
            "buffer loaded"
        );
    }

    fn start(&mut self, offset: f64) -> piano_transcriber_core::Result<()> {
        tracing::debug!(offset, "sink started");
        Ok(())
    }

    fn stop(&mut self) {
        tracing::debug!("sink stopped");
    }

    fn note_on(&mut self, note: &NoteOn) -> piano_transcriber_core::Result<()> {
        let frequency = note
            .pitch
            .parse::<Pitch>()
            .map(|pitch| pitch.frequency_hz())
            .unwrap_or_default();
        tracing::info!(
            pitch = %note.pitch,
            frequency_hz = frequency,
            duration = note.duration,
            "note on"
        );
        Ok(())
    }

    fn set_gain_db(&mut self, gain_db: f64) {
        tracing::debug!(gain_db, "gain changed");
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Transcribe, play back and engrave piano melodies", long_about = None)]
struct Cli {
    /// Optional JSON configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode a WAV file and write its transcription as JSON.
    Transcribe {
        /// Path to a 16-bit PCM WAV file.
        input: PathBuf,
        /// Output path; prints to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Render a transcription as ABC notation.
    Encode {
        /// Transcription JSON file, or a WAV file to transcribe first.
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Play a transcription in real time, logging every triggered note.
    Play {
        /// Transcription JSON file, or a WAV file to transcribe first.
        input: PathBuf,
        /// Volume in percent (0-100).
        #[arg(long)]
        volume: Option<f64>,
        /// Start position in seconds.
        #[arg(long)]
        seek: Option<f64>,
    },
    /// Build the document export request for a transcription.
    Export {
        /// Transcription JSON file, or a WAV file to transcribe first.
        input: PathBuf,
        /// Page orientation: portrait or landscape.
        #[arg(long)]
        orientation: Option<PageOrientation>,
        /// Width of the rendered sheet on the page, in millimetres.
        #[arg(long)]
        width_mm: Option<f64>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
