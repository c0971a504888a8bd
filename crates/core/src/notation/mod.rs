//! Renders note and lyric timelines as an ABC-style notation stream.
//!
//! The stream uses a fixed 4/4 meter and an eighth-note unit length. Bars are
//! closed once 32 units have accumulated, except after the final note.

use std::fmt::{self, Write as _};

use serde::Serialize;
use tracing::warn;

use crate::{config::NotationConfig, LyricTimeline, NoteTimeline, Pitch, TimedEvent};

/// Eighth-note resolution: one second of sound spans eight units.
pub const UNITS_PER_SECOND: f64 = 8.0;
pub const BEATS_PER_MEASURE: u32 = 4;
pub const UNITS_PER_MEASURE: u32 = BEATS_PER_MEASURE * 8;
pub const DEFAULT_LYRIC_TOLERANCE: f64 = 0.1;

/// Header fields handed to the rendering collaborator alongside the tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotationMetadata {
    pub title: String,
    pub meter: String,
    pub unit_length: String,
    pub key: String,
}

impl NotationMetadata {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            meter: format!("{BEATS_PER_MEASURE}/4"),
            unit_length: "1/8".to_string(),
            key: "C".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NotationToken {
    Note {
        annotation: Option<String>,
        pitch: String,
        units: u32,
    },
    BarLine,
    End,
}

impl fmt::Display for NotationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Note {
                annotation,
                pitch,
                units,
            } => {
                if let Some(text) = annotation {
                    write!(f, "\"{text}\"")?;
                }
                write!(f, "{pitch}{units} ")
            }
            Self::BarLine => f.write_str("| \n"),
            Self::End => f.write_str("|]"),
        }
    }
}

/// A note whose pitch label could not be parsed and was replaced by the
/// default pitch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PitchFallback {
    pub index: usize,
    pub pitch: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedScore {
    pub metadata: NotationMetadata,
    pub tokens: Vec<NotationToken>,
    pub warnings: Vec<PitchFallback>,
}

impl EncodedScore {
    /// Token stream without the header.
    pub fn body(&self) -> String {
        self.tokens.iter().map(ToString::to_string).collect()
    }

    /// Complete ABC document: header lines followed by the body.
    pub fn to_abc(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "X:1");
        let _ = writeln!(out, "T:{}", self.metadata.title);
        let _ = writeln!(out, "M:{}", self.metadata.meter);
        let _ = writeln!(out, "L:{}", self.metadata.unit_length);
        let _ = writeln!(out, "K:{}", self.metadata.key);
        out.push_str(&self.body());
        out
    }

    pub fn bar_count(&self) -> usize {
        self.tokens
            .iter()
            .filter(|token| matches!(token, NotationToken::BarLine))
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct NotationEncoder {
    lyric_tolerance: f64,
}

impl Default for NotationEncoder {
    fn default() -> Self {
        Self {
            lyric_tolerance: DEFAULT_LYRIC_TOLERANCE,
        }
    }
}

impl NotationEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &NotationConfig) -> Self {
        Self {
            lyric_tolerance: config.lyric_tolerance_seconds,
        }
    }

    pub fn encode(
        &self,
        notes: &NoteTimeline,
        lyrics: Option<&LyricTimeline>,
        title: &str,
    ) -> EncodedScore {
        let mut tokens = Vec::with_capacity(notes.len() + notes.len() / 8 + 1);
        let mut warnings = Vec::new();
        let mut position = 0u32;
        let last = notes.len().saturating_sub(1);

        for (index, note) in notes.iter().enumerate() {
            let pitch = match note.pitch() {
                Ok(pitch) => pitch,
                Err(_) => {
                    warn!(index, pitch = %note.pitch, "unparsable pitch, using default");
                    warnings.push(PitchFallback {
                        index,
                        pitch: note.pitch.clone(),
                    });
                    Pitch::default()
                }
            };

            let units = quantize(note.duration);
            let annotation = lyrics.and_then(|lyrics| {
                lyrics
                    .iter()
                    .find(|lyric| (lyric.start_time - note.start_time).abs() < self.lyric_tolerance)
                    .map(|lyric| lyric.text.clone())
            });

            tokens.push(NotationToken::Note {
                annotation,
                pitch: pitch.abc_token(),
                units,
            });

            position += units;
            if position >= UNITS_PER_MEASURE && index < last {
                tokens.push(NotationToken::BarLine);
                position = 0;
            }
        }

        tokens.push(NotationToken::End);

        EncodedScore {
            metadata: NotationMetadata::new(title),
            tokens,
            warnings,
        }
    }
}

/// Duration in eighth-note units, never less than one.
pub fn quantize(duration_seconds: f64) -> u32 {
    let units = (duration_seconds * UNITS_PER_SECOND).round();
    if units < 1.0 {
        1
    } else {
        units as u32
    }
}
