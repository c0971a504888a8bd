//! End-to-end playback behaviour driven by a virtual clock.

use std::sync::Arc;

use piano_transcriber_core::{
    NoteEvent, NoteTimeline, PlaybackClock, PlaybackEvent, PlaybackStatus, RecordingSink,
    TranscriberError, VirtualTimeSource,
};

const TICK: f64 = 0.1;

fn five_note_piece() -> (PlaybackClock<RecordingSink, VirtualTimeSource>, VirtualTimeSource) {
    let time = VirtualTimeSource::new();
    let mut clock = PlaybackClock::new(RecordingSink::ready(), time.clone());
    let timeline = NoteTimeline::from_events(
        [0.0, 2.0, 4.0, 6.0, 8.0]
            .iter()
            .map(|&t| NoteEvent::new("C4", t, 1.0))
            .collect(),
    )
    .expect("valid timeline");
    clock.load(Arc::new(timeline), 10.0);
    (clock, time)
}

fn run_until_idle(
    clock: &mut PlaybackClock<RecordingSink, VirtualTimeSource>,
    time: &VirtualTimeSource,
) -> Vec<PlaybackEvent> {
    let mut events = Vec::new();
    for _ in 0..1_000 {
        time.advance(TICK);
        events.extend(clock.tick());
        if clock.status() == PlaybackStatus::Idle {
            break;
        }
    }
    events
}

fn triggered_starts(events: &[PlaybackEvent], timeline: &NoteTimeline) -> Vec<f64> {
    events
        .iter()
        .filter_map(|event| match event {
            PlaybackEvent::NoteTriggered(note) => Some(timeline[note.index].start_time),
            _ => None,
        })
        .collect()
}

#[test]
fn full_play_triggers_every_note_once_and_ends_once() {
    let (mut clock, time) = five_note_piece();
    let timeline = Arc::clone(clock.timeline());

    clock.play().expect("sink is ready");
    let events = run_until_idle(&mut clock, &time);

    assert_eq!(triggered_starts(&events, &timeline), [0.0, 2.0, 4.0, 6.0, 8.0]);
    assert_eq!(clock.sink().notes().len(), 5);
    let ended = events
        .iter()
        .filter(|e| matches!(e, PlaybackEvent::Ended))
        .count();
    assert_eq!(ended, 1);
    assert_eq!(clock.status(), PlaybackStatus::Idle);
    assert_eq!(clock.elapsed(), 0.0);
}

#[test]
fn seek_then_play_only_triggers_later_notes() {
    let (mut clock, time) = five_note_piece();
    let timeline = Arc::clone(clock.timeline());

    clock.seek(5.0).unwrap();
    assert_eq!(clock.status(), PlaybackStatus::Idle);
    clock.play().unwrap();
    let events = run_until_idle(&mut clock, &time);

    assert_eq!(triggered_starts(&events, &timeline), [6.0, 8.0]);
}

#[test]
fn seek_while_paused_keeps_status_and_fires_from_the_new_position() {
    let (mut clock, time) = five_note_piece();
    let timeline = Arc::clone(clock.timeline());

    clock.play().unwrap();
    let mut events = Vec::new();
    for _ in 0..30 {
        time.advance(TICK);
        events.extend(clock.tick());
    }
    clock.pause();
    assert_eq!(triggered_starts(&events, &timeline), [0.0, 2.0]);

    clock.seek(5.0).unwrap();
    assert_eq!(clock.status(), PlaybackStatus::Paused);
    assert_eq!(clock.elapsed(), 5.0);

    clock.play().unwrap();
    let events = run_until_idle(&mut clock, &time);
    assert_eq!(triggered_starts(&events, &timeline), [6.0, 8.0]);
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, PlaybackEvent::Ended))
            .count(),
        1
    );
}

#[test]
fn tick_granularity_does_not_change_what_fires() {
    for step in [0.05, 0.3, 1.7, 4.0] {
        let (mut clock, time) = five_note_piece();
        clock.play().unwrap();
        for _ in 0..1_000 {
            time.advance(step);
            clock.tick();
            if clock.status() == PlaybackStatus::Idle {
                break;
            }
        }
        let fired: Vec<usize> = clock.sink().notes().iter().map(|n| n.index).collect();
        assert_eq!(fired, [0, 1, 2, 3, 4], "step {step}");
    }
}

#[test]
fn seek_while_playing_neither_duplicates_nor_skips() {
    let (mut clock, time) = five_note_piece();
    clock.play().unwrap();
    for _ in 0..25 {
        time.advance(TICK);
        clock.tick();
    }
    // Notes at 0 and 2 have fired; jump past the note at 4.
    clock.seek(4.5).unwrap();
    let events = run_until_idle(&mut clock, &time);
    let timeline = Arc::clone(clock.timeline());

    assert_eq!(triggered_starts(&events, &timeline), [6.0, 8.0]);
    let fired: Vec<usize> = clock.sink().notes().iter().map(|n| n.index).collect();
    assert_eq!(fired, [0, 1, 3, 4]);
}

#[test]
fn stop_resets_the_session() {
    let (mut clock, time) = five_note_piece();
    clock.play().unwrap();
    for _ in 0..30 {
        time.advance(TICK);
        clock.tick();
    }
    clock.stop();
    assert_eq!(clock.status(), PlaybackStatus::Idle);
    assert_eq!(clock.elapsed(), 0.0);
    assert_eq!(clock.triggered_count(), 0);

    clock.sink_mut().clear();
    clock.play().unwrap();
    run_until_idle(&mut clock, &time);
    assert_eq!(clock.sink().notes().len(), 5);
}

#[test]
fn sink_error_is_reported_and_not_retried() {
    let (mut clock, time) = five_note_piece();
    clock.play().unwrap();
    clock.sink_mut().fail_note_on(true);

    time.advance(TICK);
    let events = clock.tick();
    assert!(matches!(events.first(), Some(PlaybackEvent::Error(_))));
    assert_eq!(clock.status(), PlaybackStatus::Idle);

    time.advance(TICK);
    assert!(clock.tick().is_empty());

    clock.sink_mut().fail_note_on(false);
    clock.play().unwrap();
    assert_eq!(clock.status(), PlaybackStatus::Playing);
}

#[test]
fn play_without_audio_fails() {
    let time = VirtualTimeSource::new();
    let mut clock = PlaybackClock::new(RecordingSink::new(), time);
    assert!(matches!(clock.play(), Err(TranscriberError::SinkNotReady)));
}
