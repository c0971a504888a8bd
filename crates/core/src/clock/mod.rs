//! Wall-clock synchronised playback of a [`NoteTimeline`].
//!
//! The clock is driven by a periodic [`PlaybackClock::tick`] that the host
//! schedules (every 100 ms by default). Time is read from an injectable
//! [`TimeSource`] so the whole state machine can be exercised without real
//! delays.

use std::{cell::Cell, collections::HashSet, rc::Rc, sync::Arc, time::Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    audio::{AudioSink, DecodedAudio, NoteOn},
    gain, NoteTimeline, Result, TimedEvent, TranscriberError,
};

/// Monotonic seconds since an arbitrary origin.
pub trait TimeSource {
    fn now(&self) -> f64;
}

/// Real time backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Manually advanced time. Clones share the same underlying instant, so a
/// test can keep one handle while the clock owns another.
#[derive(Debug, Clone, Default)]
pub struct VirtualTimeSource {
    now: Rc<Cell<f64>>,
}

impl VirtualTimeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, seconds: f64) {
        self.now.set(self.now.get() + seconds);
    }

    pub fn set(&self, seconds: f64) {
        self.now.set(seconds);
    }
}

impl TimeSource for VirtualTimeSource {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Playing,
    Paused,
}

/// Notifications produced by [`PlaybackClock::tick`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PlaybackEvent {
    NoteTriggered(NoteOn),
    TimeChanged(f64),
    StatusChanged(PlaybackStatus),
    Ended,
    Error(String),
}

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// Sole owner of the playback session: status, elapsed time and the set of
/// notes already triggered.
#[derive(Debug)]
pub struct PlaybackClock<S, T> {
    sink: S,
    time: T,
    timeline: Arc<NoteTimeline>,
    duration: f64,
    status: PlaybackStatus,
    volume_percent: f64,
    /// Elapsed time at `reference`.
    offset: f64,
    /// Time-source reading taken when playback (re)started.
    reference: f64,
    /// Elapsed time observed by the previous tick.
    last_tick: f64,
    /// The first tick after play/seek also fires notes starting exactly at
    /// `last_tick`.
    window_inclusive: bool,
    triggered: HashSet<usize>,
}

impl<S: AudioSink, T: TimeSource> PlaybackClock<S, T> {
    pub fn new(sink: S, time: T) -> Self {
        Self {
            sink,
            time,
            timeline: Arc::new(NoteTimeline::default()),
            duration: 0.0,
            status: PlaybackStatus::Idle,
            volume_percent: gain::MAX_VOLUME_PERCENT,
            offset: 0.0,
            reference: 0.0,
            last_tick: 0.0,
            window_inclusive: true,
            triggered: HashSet::new(),
        }
    }

    /// Installs a new timeline, ending any running session.
    pub fn load(&mut self, timeline: Arc<NoteTimeline>, duration: f64) {
        self.stop();
        self.timeline = timeline;
        self.duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        info!(
            notes = self.timeline.len(),
            duration = self.duration,
            "timeline loaded"
        );
    }

    /// Hands a freshly decoded buffer to the sink, ending any running session.
    pub fn load_audio(&mut self, audio: &DecodedAudio) {
        self.stop();
        self.sink.load_buffer(audio);
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn volume_percent(&self) -> f64 {
        self.volume_percent
    }

    pub fn timeline(&self) -> &Arc<NoteTimeline> {
        &self.timeline
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn time_source(&self) -> &T {
        &self.time
    }

    /// Current position in seconds, clamped to `[0, duration]`.
    pub fn elapsed(&self) -> f64 {
        match self.status {
            PlaybackStatus::Playing => {
                (self.offset + self.time.now() - self.reference).clamp(0.0, self.duration)
            }
            _ => self.offset,
        }
    }

    /// Number of notes fired in the current session.
    pub fn triggered_count(&self) -> usize {
        self.triggered.len()
    }

    pub fn play(&mut self) -> Result<()> {
        match self.status {
            PlaybackStatus::Playing => {
                debug!("play ignored, already playing");
                return Ok(());
            }
            PlaybackStatus::Idle => {
                self.triggered.clear();
                self.last_tick = self.offset;
                self.window_inclusive = true;
            }
            // Keeps the tick window; notes between the last tick and the
            // pause fire on the next tick.
            PlaybackStatus::Paused => {}
        }

        if !self.sink.is_ready() {
            return Err(TranscriberError::SinkNotReady);
        }

        if let Err(err) = self.sink.start(self.offset) {
            warn!(%err, "sink failed to start");
            self.reset_to_idle();
            return Err(err);
        }

        self.reference = self.time.now();
        self.status = PlaybackStatus::Playing;
        info!(offset = self.offset, "playback started");
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.status != PlaybackStatus::Playing {
            debug!(status = ?self.status, "pause ignored");
            return;
        }

        self.offset = self.elapsed();
        self.sink.stop();
        self.status = PlaybackStatus::Paused;
        info!(offset = self.offset, "playback paused");
    }

    pub fn stop(&mut self) {
        self.reset_to_idle();
        info!("playback stopped");
    }

    /// Moves the play head to `t`, clamped to `[0, duration]`. Status is
    /// unchanged; a running session restarts the sink at the new offset.
    pub fn seek(&mut self, t: f64) -> Result<()> {
        let target = if t.is_nan() { 0.0 } else { t.clamp(0.0, self.duration) };

        self.offset = target;
        self.last_tick = target;
        self.window_inclusive = true;
        self.triggered.clear();
        debug!(target, status = ?self.status, "seek");

        if self.status == PlaybackStatus::Playing {
            self.reference = self.time.now();
            self.sink.stop();
            if let Err(err) = self.sink.start(target) {
                warn!(%err, "sink failed to restart after seek");
                self.reset_to_idle();
                return Err(err);
            }
        }

        Ok(())
    }

    /// Applies a volume level. Out-of-range values are rejected and leave the
    /// current gain untouched.
    pub fn set_volume(&mut self, volume_percent: f64) -> Result<()> {
        let gain_db = gain::to_gain_db(volume_percent)?;
        self.volume_percent = volume_percent;
        self.sink.set_gain_db(gain_db);
        Ok(())
    }

    /// Advances the session. Every note whose start lies in
    /// `(previous tick, elapsed]` and has not fired yet is sent to the sink.
    pub fn tick(&mut self) -> Vec<PlaybackEvent> {
        if self.status != PlaybackStatus::Playing {
            return Vec::new();
        }

        let mut events = Vec::new();
        let elapsed = self.elapsed();
        let timeline = Arc::clone(&self.timeline);
        let notes = timeline.as_slice();

        let lo = if self.window_inclusive {
            notes.partition_point(|n| n.start_time() < self.last_tick)
        } else {
            notes.partition_point(|n| n.start_time() <= self.last_tick)
        };
        let hi = notes.partition_point(|n| n.start_time() <= elapsed);

        for (index, note) in notes.iter().enumerate().take(hi).skip(lo) {
            if !self.triggered.insert(index) {
                continue;
            }

            let note_on = NoteOn {
                index,
                pitch: note.pitch.clone(),
                duration: note.duration,
            };
            if let Err(err) = self.sink.note_on(&note_on) {
                warn!(%err, index, "sink failed mid-session");
                self.reset_to_idle();
                events.push(PlaybackEvent::Error(err.to_string()));
                events.push(PlaybackEvent::StatusChanged(PlaybackStatus::Idle));
                return events;
            }
            events.push(PlaybackEvent::NoteTriggered(note_on));
        }

        self.last_tick = elapsed;
        self.window_inclusive = false;
        events.push(PlaybackEvent::TimeChanged(elapsed));

        if elapsed >= self.duration {
            self.reset_to_idle();
            info!("playback reached end of piece");
            events.push(PlaybackEvent::Ended);
            events.push(PlaybackEvent::StatusChanged(PlaybackStatus::Idle));
        }

        events
    }

    fn reset_to_idle(&mut self) {
        self.sink.stop();
        self.status = PlaybackStatus::Idle;
        self.offset = 0.0;
        self.reference = 0.0;
        self.last_tick = 0.0;
        self.window_inclusive = true;
        self.triggered.clear();
    }
}

/// Formats seconds as `m:ss` for transport displays.
pub fn format_time(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let mins = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{mins}:{secs:02}")
}
