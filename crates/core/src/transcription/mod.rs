//! Transcription results and the collaborator that produces them.
//!
//! Real pitch detection is out of scope; [`MockTranscriber`] returns a fixed
//! melody so the rest of the pipeline can be exercised end to end.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    audio::DecodedAudio, LyricEvent, LyricTimeline, NoteEvent, NoteTimeline, Result,
};

pub const UNTITLED_SONG: &str = "Untitled Song";

/// Duration assumed when no decoded buffer is available.
pub const FALLBACK_DURATION_SECONDS: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcription {
    pub song_title: String,
    pub notes: Vec<NoteEvent>,
    #[serde(default)]
    pub lyrics: Vec<LyricEvent>,
    #[serde(default = "fallback_duration")]
    pub duration: f64,
}

fn fallback_duration() -> f64 {
    FALLBACK_DURATION_SECONDS
}

impl Transcription {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validates and sorts both event lists. Nothing is returned unless both
    /// timelines are well formed.
    pub fn timelines(&self) -> Result<(NoteTimeline, Option<LyricTimeline>)> {
        let notes = NoteTimeline::from_events(self.notes.clone())?;
        let lyrics = if self.lyrics.is_empty() {
            None
        } else {
            Some(LyricTimeline::from_events(self.lyrics.clone())?)
        };
        Ok((notes, lyrics))
    }
}

pub trait Transcriber {
    fn transcribe(&self, audio: &DecodedAudio, file_name: &str) -> Result<Transcription>;
}

/// Stand-in transcriber producing a fixed 24-note melody.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockTranscriber;

const MOCK_MELODY: [(&str, f64, f64); 24] = [
    ("C4", 0.0, 0.5),
    ("E4", 0.5, 0.5),
    ("G4", 1.0, 0.5),
    ("C5", 1.5, 1.0),
    ("A4", 2.5, 0.5),
    ("G4", 3.0, 1.0),
    ("F4", 4.0, 0.5),
    ("E4", 4.5, 0.5),
    ("D4", 5.0, 0.5),
    ("C4", 5.5, 1.0),
    ("D4", 6.5, 0.5),
    ("E4", 7.0, 0.5),
    ("F4", 7.5, 0.5),
    ("G4", 8.0, 1.0),
    ("A4", 9.0, 0.5),
    ("B4", 9.5, 0.5),
    ("C5", 10.0, 1.0),
    ("B4", 11.0, 0.5),
    ("A4", 11.5, 0.5),
    ("G4", 12.0, 1.0),
    ("F4", 13.0, 0.5),
    ("E4", 13.5, 0.5),
    ("D4", 14.0, 0.5),
    ("C4", 14.5, 1.5),
];

const SYLLABLES: [&str; 10] = ["La", "Do", "Re", "Mi", "Fa", "Sol", "Oh", "Ah", "Hey", "Na"];
const WORDS: [&str; 8] = [
    "Music", "Melody", "Rhythm", "Song", "Voice", "Sound", "Harmony", "Tempo",
];

impl Transcriber for MockTranscriber {
    fn transcribe(&self, audio: &DecodedAudio, file_name: &str) -> Result<Transcription> {
        let notes: Vec<NoteEvent> = MOCK_MELODY
            .iter()
            .map(|&(pitch, time, duration)| NoteEvent::new(pitch, time, duration))
            .collect();
        let lyrics = mock_lyrics(&notes);

        Ok(Transcription {
            song_title: title_from_file_name(file_name),
            notes,
            lyrics,
            duration: audio.duration_seconds(),
        })
    }
}

/// One lyric for every third note. Every fourth lyric is a whole word, the
/// rest are sung syllables.
pub fn mock_lyrics(notes: &[NoteEvent]) -> Vec<LyricEvent> {
    notes
        .iter()
        .step_by(3)
        .enumerate()
        .map(|(index, note)| {
            let text = if index % 4 == 0 {
                WORDS[index % WORDS.len()]
            } else {
                SYLLABLES[index % SYLLABLES.len()]
            };
            LyricEvent::new(text, note.pitch.clone(), note.start_time, note.duration)
        })
        .collect()
}

/// File name with its final extension removed, or the untitled placeholder.
pub fn title_from_file_name(file_name: &str) -> String {
    let name = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_name);
    let stem = match name.rfind('.') {
        Some(dot) => &name[..dot],
        None => name,
    };
    if stem.is_empty() {
        UNTITLED_SONG.to_string()
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silence(seconds: u32) -> DecodedAudio {
        DecodedAudio {
            sample_rate: 100,
            channels: 1,
            samples: vec![0.0; (seconds * 100) as usize],
        }
    }

    #[test]
    fn mock_transcription_uses_decoded_duration() {
        let result = MockTranscriber.transcribe(&silence(16), "take one.wav").unwrap();
        assert_eq!(result.song_title, "take one");
        assert_eq!(result.notes.len(), 24);
        assert_eq!(result.duration, 16.0);

        let (notes, lyrics) = result.timelines().unwrap();
        assert_eq!(notes.len(), 24);
        assert_eq!(lyrics.map(|l| l.len()), Some(8));
    }

    #[test]
    fn lyrics_alternate_words_and_syllables() {
        let notes: Vec<NoteEvent> = (0..12).map(|i| NoteEvent::new("C4", i as f64, 1.0)).collect();
        let lyrics = mock_lyrics(&notes);

        let texts: Vec<&str> = lyrics.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["Music", "Do", "Re", "Mi"]);
        assert_eq!(lyrics[1].start_time, 3.0);
    }

    #[test]
    fn derives_titles_from_file_names() {
        assert_eq!(title_from_file_name("song.mp3"), "song");
        assert_eq!(title_from_file_name("dir/my.song.flac"), "my.song");
        assert_eq!(title_from_file_name("noext"), "noext");
        assert_eq!(title_from_file_name(".wav"), UNTITLED_SONG);
    }

    #[test]
    fn reads_collaborator_json() {
        let json = r#"{
            "songTitle": "Ode",
            "notes": [{"note": "E4", "time": 0, "duration": 0.5}]
        }"#;
        let transcription = Transcription::from_json_str(json).unwrap();
        assert_eq!(transcription.song_title, "Ode");
        assert!(transcription.lyrics.is_empty());
        assert_eq!(transcription.duration, FALLBACK_DURATION_SECONDS);
    }
}
