//! Core library for the Piano Transcriber application.
//!
//! The crate keeps a stream of transcribed notes in step with a running
//! playback clock and renders the same stream as bar-wrapped notation with
//! aligned lyrics. Each module owns one subsystem; presentation, export
//! rendering and sound generation are left to the collaborators behind the
//! [`AudioSink`] and [`ExportSink`] traits.

pub mod audio;
pub mod clock;
pub mod config;
pub mod error;
pub mod export;
pub mod gain;
pub mod notation;
pub mod pitch;
pub mod projector;
pub mod session;
pub mod timeline;
pub mod transcription;

pub use audio::{AudioDecoder, AudioSink, DecodedAudio, NoteOn, RecordingSink, SinkCall, WavDecoder};
pub use clock::{
    format_time, PlaybackClock, PlaybackEvent, PlaybackStatus, SystemTimeSource, TimeSource,
    VirtualTimeSource,
};
pub use config::{AppConfig, NotationConfig, PlaybackConfig};
pub use error::{Result, TranscriberError};
pub use export::{ExportRequest, ExportSettings, ExportSink, JsonExportSink, PageOrientation};
pub use gain::to_gain_db;
pub use notation::{EncodedScore, NotationEncoder, NotationMetadata, NotationToken};
pub use pitch::{Accidental, Letter, Pitch, PitchClass};
pub use projector::{active_at, ActiveState};
pub use session::{LoadOutcome, LoadTicket, Song, TranscriptionSession};
pub use timeline::{LyricEvent, LyricTimeline, NoteEvent, NoteTimeline, TimedEvent, Timeline};
pub use transcription::{MockTranscriber, Transcriber, Transcription};
