use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::{pitch, Pitch, Result, TranscriberError};

/// Shared temporal shape of everything placed on a timeline.
pub trait TimedEvent {
    fn start_time(&self) -> f64;
    fn duration(&self) -> f64;
    /// Pitch label in scientific notation, e.g. `"C#4"`.
    fn pitch_label(&self) -> &str;

    fn end_time(&self) -> f64 {
        self.start_time() + self.duration()
    }

    /// Half-open containment: `start <= t < start + duration`.
    fn is_active_at(&self, t: f64) -> bool {
        self.start_time() <= t && t < self.end_time()
    }

    /// Strict parse of [`TimedEvent::pitch_label`].
    fn pitch(&self) -> Result<Pitch> {
        self.pitch_label().parse()
    }
}

/// A single pitched sound as delivered by the transcription collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    #[serde(rename = "note")]
    pub pitch: String,
    #[serde(rename = "time")]
    pub start_time: f64,
    pub duration: f64,
}

impl NoteEvent {
    pub fn new(pitch: impl Into<String>, start_time: f64, duration: f64) -> Self {
        Self {
            pitch: pitch.into(),
            start_time,
            duration,
        }
    }
}

impl TimedEvent for NoteEvent {
    fn start_time(&self) -> f64 {
        self.start_time
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn pitch_label(&self) -> &str {
        &self.pitch
    }
}

/// A syllable or word aligned to a pitch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricEvent {
    pub text: String,
    #[serde(rename = "note")]
    pub pitch: String,
    #[serde(rename = "time")]
    pub start_time: f64,
    pub duration: f64,
}

impl LyricEvent {
    pub fn new(
        text: impl Into<String>,
        pitch: impl Into<String>,
        start_time: f64,
        duration: f64,
    ) -> Self {
        Self {
            text: text.into(),
            pitch: pitch.into(),
            start_time,
            duration,
        }
    }
}

impl TimedEvent for LyricEvent {
    fn start_time(&self) -> f64 {
        self.start_time
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn pitch_label(&self) -> &str {
        &self.pitch
    }
}

/// Immutable sequence of events ordered by non-decreasing start time.
///
/// There are no mutating operations; a new transcription produces a new
/// timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline<E> {
    events: Vec<E>,
}

pub type NoteTimeline = Timeline<NoteEvent>;
pub type LyricTimeline = Timeline<LyricEvent>;

impl<E> Default for Timeline<E> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<E: TimedEvent> Timeline<E> {
    /// Validates every event and returns them stably sorted by start time.
    pub fn from_events(events: Vec<E>) -> Result<Self> {
        for (index, event) in events.iter().enumerate() {
            validate(index, event)?;
        }

        let mut events = events;
        // `sort_by` is stable, so events sharing a start keep their input order.
        events.sort_by(|a, b| a.start_time().total_cmp(&b.start_time()));

        Ok(Self { events })
    }

    /// Events whose start lies in `[from, to)`, in stored order.
    pub fn slice(&self, from: f64, to: f64) -> &[E] {
        let lo = self.events.partition_point(|e| e.start_time() < from);
        let hi = self.events.partition_point(|e| e.start_time() < to);
        if lo >= hi {
            &[]
        } else {
            &self.events[lo..hi]
        }
    }

    /// Latest end time across all events, or zero for an empty timeline.
    pub fn end_time(&self) -> f64 {
        self.events
            .iter()
            .map(TimedEvent::end_time)
            .fold(0.0, f64::max)
    }
}

impl<E> Timeline<E> {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&E> {
        self.events.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.events.iter()
    }

    pub fn as_slice(&self) -> &[E] {
        &self.events
    }
}

impl<E> Index<usize> for Timeline<E> {
    type Output = E;

    fn index(&self, index: usize) -> &E {
        &self.events[index]
    }
}

impl<'a, E> IntoIterator for &'a Timeline<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

fn validate<E: TimedEvent>(index: usize, event: &E) -> Result<()> {
    let duration = event.duration();
    if !duration.is_finite() || duration <= 0.0 {
        return Err(TranscriberError::invalid_timeline(format!(
            "event {index} has non-positive duration {duration}"
        )));
    }

    let start = event.start_time();
    if !start.is_finite() || start < 0.0 {
        return Err(TranscriberError::invalid_timeline(format!(
            "event {index} has invalid start time {start}"
        )));
    }

    if pitch::leading_letter(event.pitch_label()).is_none() {
        return Err(TranscriberError::invalid_timeline(format!(
            "event {index} has pitch `{}` outside A–G",
            event.pitch_label()
        )));
    }

    Ok(())
}
