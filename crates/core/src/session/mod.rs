//! The song currently loaded into the application and the playback clock that
//! drives it.
//!
//! Decoding is the only slow step. Every upload takes a [`LoadTicket`] from
//! [`TranscriptionSession::begin_load`]; a result is applied only if its ticket
//! is still the most recent one, so a slow decode can never overwrite a newer
//! upload.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    audio::{AudioSink, DecodedAudio},
    clock::{PlaybackClock, TimeSource},
    config::AppConfig,
    export::{ExportRequest, ExportSettings, ExportSink},
    projector::ActiveState,
    transcription::{Transcriber, Transcription},
    EncodedScore, LyricTimeline, NotationEncoder, NoteTimeline, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied { generation: u64, notes: usize },
    Stale { generation: u64, latest: u64 },
}

/// A transcribed song with its validated, shared timelines.
#[derive(Debug, Clone)]
pub struct Song {
    pub title: String,
    pub notes: Arc<NoteTimeline>,
    pub lyrics: Option<Arc<LyricTimeline>>,
    pub duration: f64,
}

impl Song {
    /// Validates both timelines before building anything.
    pub fn from_transcription(transcription: Transcription, default_title: &str) -> Result<Self> {
        let (notes, lyrics) = transcription.timelines()?;
        let duration = if transcription.duration > 0.0 {
            transcription.duration
        } else {
            notes.end_time()
        };
        let title = if transcription.song_title.trim().is_empty() {
            default_title.to_string()
        } else {
            transcription.song_title
        };

        Ok(Self {
            title,
            notes: Arc::new(notes),
            lyrics: lyrics.map(Arc::new),
            duration,
        })
    }
}

#[derive(Debug)]
pub struct TranscriptionSession<S, T> {
    clock: PlaybackClock<S, T>,
    encoder: NotationEncoder,
    export_settings: ExportSettings,
    default_title: String,
    song: Option<Song>,
    generation: u64,
}

impl<S: AudioSink, T: TimeSource> TranscriptionSession<S, T> {
    pub fn new(sink: S, time: T, config: &AppConfig) -> Result<Self> {
        let mut clock = PlaybackClock::new(sink, time);
        clock.set_volume(config.playback.volume_percent)?;
        let export_settings =
            ExportSettings::new(config.export.orientation, config.export.page_width_mm)?;

        Ok(Self {
            clock,
            encoder: NotationEncoder::from_config(&config.notation),
            export_settings,
            default_title: config.notation.default_title.clone(),
            song: None,
            generation: 0,
        })
    }

    /// Registers a new upload. Any load still in flight becomes stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        debug!(generation = self.generation, "load requested");
        LoadTicket {
            generation: self.generation,
        }
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Applies a finished decode if `ticket` is still current.
    ///
    /// Stale results are dropped without touching any state. A decode or
    /// transcription failure is returned and leaves the previous song and
    /// clock exactly as they were.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        decoded: Result<DecodedAudio>,
        transcriber: &dyn Transcriber,
        file_name: &str,
    ) -> Result<LoadOutcome> {
        if !self.is_current(ticket) {
            info!(
                generation = ticket.generation,
                latest = self.generation,
                "discarding stale load"
            );
            return Ok(LoadOutcome::Stale {
                generation: ticket.generation,
                latest: self.generation,
            });
        }

        let audio = decoded?;
        let transcription = transcriber.transcribe(&audio, file_name)?;
        let song = Song::from_transcription(transcription, &self.default_title)?;

        self.clock.load_audio(&audio);
        Ok(self.install(ticket.generation, song))
    }

    /// Loads a transcription that arrived without audio, e.g. from a saved
    /// JSON file. The sink keeps whatever buffer it already has.
    pub fn load_transcription(&mut self, transcription: Transcription) -> Result<LoadOutcome> {
        let song = Song::from_transcription(transcription, &self.default_title)?;
        let ticket = self.begin_load();
        Ok(self.install(ticket.generation, song))
    }

    fn install(&mut self, generation: u64, song: Song) -> LoadOutcome {
        self.clock.load(Arc::clone(&song.notes), song.duration);
        let notes = song.notes.len();
        info!(generation, title = %song.title, notes, "song loaded");
        self.song = Some(song);
        LoadOutcome::Applied { generation, notes }
    }

    pub fn song(&self) -> Option<&Song> {
        self.song.as_ref()
    }

    pub fn clock(&self) -> &PlaybackClock<S, T> {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut PlaybackClock<S, T> {
        &mut self.clock
    }

    /// What every display surface should highlight right now.
    pub fn active_state(&self) -> ActiveState {
        let t = self.clock.elapsed();
        match &self.song {
            Some(song) => ActiveState::project(&song.notes, song.lyrics.as_deref(), t),
            None => ActiveState {
                time: t,
                ..ActiveState::default()
            },
        }
    }

    pub fn encode(&self) -> Option<EncodedScore> {
        self.song.as_ref().map(|song| {
            self.encoder
                .encode(&song.notes, song.lyrics.as_deref(), &song.title)
        })
    }

    pub fn export_request(&self) -> Option<ExportRequest> {
        let song = self.song.as_ref()?;
        let score = self.encode()?;
        Some(ExportRequest::build(
            &score,
            song.lyrics.as_deref(),
            self.export_settings,
        ))
    }

    /// Sends the current export request to `sink`. Returns `false` when no
    /// song is loaded.
    pub fn export(&self, sink: &mut dyn ExportSink) -> Result<bool> {
        match self.export_request() {
            Some(request) => {
                sink.submit(&request)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
