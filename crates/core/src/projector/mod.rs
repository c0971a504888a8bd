//! Maps a timestamp to the events sounding at that instant.
//!
//! Every display surface (keyboard, staff, lyric line) goes through these
//! functions so they agree on what is active for the same `t`.

use serde::Serialize;

use crate::{LyricEvent, LyricTimeline, NoteEvent, NoteTimeline, TimedEvent, Timeline};

/// Events with `start <= t < start + duration`, in stored order.
pub fn active_at<E: TimedEvent>(timeline: &Timeline<E>, t: f64) -> Vec<&E> {
    timeline.iter().filter(|event| event.is_active_at(t)).collect()
}

/// Same selection as [`active_at`], reported as timeline indices.
pub fn active_indices<E: TimedEvent>(timeline: &Timeline<E>, t: f64) -> Vec<usize> {
    timeline
        .iter()
        .enumerate()
        .filter(|(_, event)| event.is_active_at(t))
        .map(|(index, _)| index)
        .collect()
}

/// Distinct pitch labels active at `t`, in first-seen order. This is what the
/// keyboard highlight consumes.
pub fn active_pitches<E: TimedEvent>(timeline: &Timeline<E>, t: f64) -> Vec<String> {
    let mut pitches: Vec<String> = Vec::new();
    for event in active_at(timeline, t) {
        if !pitches.iter().any(|p| p == event.pitch_label()) {
            pitches.push(event.pitch_label().to_string());
        }
    }
    pitches
}

/// Snapshot of everything sounding at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActiveState {
    pub time: f64,
    pub notes: Vec<NoteEvent>,
    pub lyrics: Vec<LyricEvent>,
    pub pitches: Vec<String>,
}

impl ActiveState {
    pub fn project(notes: &NoteTimeline, lyrics: Option<&LyricTimeline>, t: f64) -> Self {
        Self {
            time: t,
            notes: active_at(notes, t).into_iter().cloned().collect(),
            lyrics: lyrics
                .map(|lyrics| active_at(lyrics, t).into_iter().cloned().collect())
                .unwrap_or_default(),
            pitches: active_pitches(notes, t),
        }
    }

    pub fn is_silent(&self) -> bool {
        self.notes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline() -> NoteTimeline {
        NoteTimeline::from_events(vec![
            NoteEvent::new("C4", 0.0, 1.0),
            NoteEvent::new("E4", 0.5, 1.0),
            NoteEvent::new("C4", 0.75, 0.5),
            NoteEvent::new("G4", 2.0, 0.5),
        ])
        .unwrap()
    }

    fn brute_force(timeline: &NoteTimeline, t: f64) -> Vec<usize> {
        (0..timeline.len())
            .filter(|&i| {
                let e = &timeline[i];
                e.start_time <= t && t < e.start_time + e.duration
            })
            .collect()
    }

    #[test]
    fn matches_brute_force_filter() {
        let timeline = timeline();
        let mut t = -0.5;
        while t < 3.0 {
            assert_eq!(active_indices(&timeline, t), brute_force(&timeline, t), "t = {t}");
            t += 0.05;
        }
    }

    #[test]
    fn interval_is_half_open() {
        let timeline = timeline();
        assert_eq!(active_indices(&timeline, 0.0), [0]);
        assert_eq!(active_indices(&timeline, 1.0), [1, 2]);
        assert!(active_at(&timeline, 2.5).is_empty());
    }

    #[test]
    fn deduplicates_pitches_for_keyboard() {
        let timeline = timeline();
        assert_eq!(active_pitches(&timeline, 0.8), ["C4", "E4"]);
    }

    #[test]
    fn lyrics_and_notes_share_the_same_rule() {
        let notes = timeline();
        let lyrics = LyricTimeline::from_events(vec![
            LyricEvent::new("La", "C4", 0.0, 1.0),
            LyricEvent::new("Sol", "G4", 2.0, 0.5),
        ])
        .unwrap();

        let state = ActiveState::project(&notes, Some(&lyrics), 2.0);
        assert_eq!(state.notes.len(), 1);
        assert_eq!(state.lyrics[0].text, "Sol");
        assert_eq!(state.pitches, ["G4"]);

        let silent = ActiveState::project(&notes, None, 1.75);
        assert!(silent.is_silent());
        assert!(silent.lyrics.is_empty());
    }
}
