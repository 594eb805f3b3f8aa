use seq_core::{PlaybackState, RecordingBackend, Sequencer, SequencerError, Status, VirtualClock};
use seq_engine::recording::TriggerKind;
use seq_song::{Note, Song, parse_song};
use seq_transport::beats_to_time;

const ONE_NOTE: &str = r#"{
    "bpm": 120,
    "beatsPerBar": 4,
    "channels": [{ "id": "lead" }],
    "instruments": [{ "id": "synth", "generators": [{ "type": "oscillator" }] }],
    "patterns": [{
        "id": "p1",
        "bars": 1,
        "events": [
            { "type": "NoteOn", "beat": 0, "channelId": "lead", "instrumentId": "synth", "note": "C4", "velocity": 0.8 },
            { "type": "NoteOff", "beat": 0.5, "channelId": "lead", "instrumentId": "synth", "note": "C4", "velocity": 0.5 }
        ]
    }],
    "sequence": [{ "patternId": "p1", "beat": 0 }]
}"#;

const TWO_NOTES: &str = r#"{
    "bpm": 120,
    "beatsPerBar": 4,
    "channels": [{ "id": "lead" }],
    "instruments": [{ "id": "synth", "generators": [{ "type": "oscillator" }] }],
    "patterns": [{
        "id": "p1",
        "bars": 1,
        "events": [
            { "type": "NoteOn", "beat": 0, "channelId": "lead", "instrumentId": "synth", "note": "C4", "velocity": 0.8 },
            { "type": "NoteOn", "beat": 2, "channelId": "lead", "instrumentId": "synth", "note": "E4", "velocity": 0.8 }
        ]
    }],
    "sequence": [{ "patternId": "p1", "beat": 0 }]
}"#;

fn load(json: &str) -> Song {
    parse_song(json).expect("parse song")
}

fn playing(json: &str) -> Sequencer<VirtualClock, RecordingBackend> {
    let mut seq = Sequencer::new(VirtualClock::default(), RecordingBackend::new());
    seq.load_song(load(json)).expect("load song");
    seq.start();
    seq
}

#[test]
fn test_single_note_song() {
    let mut seq = playing(ONE_NOTE);
    assert_eq!(seq.song_length(), 4.0);

    seq.clock_mut().advance(0.25);
    let triggers = seq.backend().triggers();
    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0].kind, TriggerKind::AttackRelease);
    assert_eq!(triggers[0].note, Note::Name("C4".to_string()));
    assert_eq!(triggers[0].duration, Some(beats_to_time(0.5, 4)));
    assert_eq!(triggers[0].time, 0.0);
}

#[test]
fn test_restart_clears_previous_schedule() {
    let mut seq = playing(ONE_NOTE);
    seq.clock_mut().advance(0.25);
    seq.stop();

    assert_eq!(seq.state(), PlaybackState::Stopped);
    assert_eq!(seq.current_position(), 0.0);
    assert_eq!(seq.clock().scheduled_count(), 0);

    seq.start();
    assert_eq!(seq.current_position(), 0.0);
    assert_eq!(seq.clock().scheduled_count(), 2);

    seq.clock_mut().advance(0.25);
    assert_eq!(seq.backend().triggers().len(), 2);
}

#[test]
fn test_cleanup_twice_releases_all_nodes_once() {
    let mut seq = playing(ONE_NOTE);
    seq.clock_mut().advance(0.25);

    seq.cleanup();
    seq.cleanup();

    assert!(seq.session().is_none());
    assert_eq!(seq.song_length(), 0.0);
    assert_eq!(seq.clock().scheduled_count(), 0);
    assert!(seq.backend().over_disposed().is_empty());
    assert!(seq.backend().live_nodes().is_empty());
}

#[test]
fn test_stops_itself_at_song_end() {
    let mut seq = playing(ONE_NOTE);

    seq.clock_mut().advance(1.0);
    assert_eq!(seq.poll(), None);
    assert!(seq.is_playing());

    // 4 beats at 120 bpm end two seconds in
    seq.clock_mut().advance(1.5);
    assert_eq!(seq.poll(), Some(Status::Ended { time: 2.0 }));
    assert_eq!(seq.state(), PlaybackState::Stopped);
    assert_eq!(seq.clock().scheduled_count(), 0);
    assert_eq!(seq.poll(), None);
}

#[test]
fn test_looping_refires_every_iteration() {
    let mut song = load(ONE_NOTE);
    song.looping = true;
    let mut seq = Sequencer::new(VirtualClock::default(), RecordingBackend::new());
    seq.load_song(song).expect("load song");
    seq.start();

    // nine beats: iterations starting at 0, 4 and 8
    seq.clock_mut().advance(4.5);
    assert_eq!(seq.backend().triggers().len(), 3);
    assert_eq!(seq.poll(), None);
    assert!(seq.is_playing());
}

#[test]
fn test_pause_and_resume_continue_from_position() {
    let mut seq = playing(TWO_NOTES);
    seq.clock_mut().advance(0.5);
    seq.pause();

    seq.clock_mut().advance(5.0);
    assert_eq!(seq.backend().triggers().len(), 1);
    assert_eq!(seq.state(), PlaybackState::Paused);

    seq.resume();
    assert_eq!(seq.snapshot().position_at_start, 1.0);
    seq.clock_mut().advance(0.6);

    let notes: Vec<Note> = seq.backend().triggers().into_iter().map(|t| t.note).collect();
    assert_eq!(
        notes,
        vec![Note::Name("C4".to_string()), Note::Name("E4".to_string())]
    );
}

#[test]
fn test_start_after_pause_rewinds() {
    let mut seq = playing(TWO_NOTES);
    seq.clock_mut().advance(1.5);
    seq.pause();
    seq.start();

    assert!(seq.is_playing());
    assert_eq!(seq.current_position(), 0.0);
    assert_eq!(seq.clock().scheduled_count(), 3);
}

#[test]
fn test_same_instrument_on_two_channels_is_two_instances() {
    let json = r#"{
        "bpm": 100,
        "beatsPerBar": 3,
        "channels": [{ "id": "left", "pan": -1 }, { "id": "right", "pan": 1 }],
        "instruments": [{ "id": "synth", "generators": [{ "type": "oscillator" }] }],
        "patterns": [
            { "id": "both", "bars": 1, "events": [
                { "type": "NoteOn", "beat": 0, "channelId": "left", "instrumentId": "synth", "note": "A3", "velocity": 1 },
                { "type": "NoteOn", "beat": 1, "channelId": "right", "instrumentId": "synth", "note": "A4", "velocity": 1 },
                { "type": "NoteOn", "beat": 2, "channelId": "left", "instrumentId": "synth", "note": "A3", "velocity": 1 }
            ]}
        ],
        "sequence": [{ "patternId": "both", "beat": 0 }]
    }"#;
    let seq = playing(json);
    let session = seq.session().expect("session");
    assert_eq!(session.graph().instrument_count(), 2);
    assert_eq!(seq.song_length(), 3.0);
}

#[test]
fn test_reload_cancels_stale_callbacks() {
    let mut seq = playing(ONE_NOTE);
    seq.load_song(load(TWO_NOTES)).expect("reload");

    assert_eq!(seq.state(), PlaybackState::Stopped);
    assert_eq!(seq.clock().scheduled_count(), 0);

    seq.clock_mut().advance(3.0);
    assert!(seq.backend().triggers().is_empty());
}

#[test]
fn test_legacy_song_plays_after_migration() {
    let json = r#"{
        "bpm": 120,
        "beatsPerBar": 4,
        "channels": [{ "id": "lead" }],
        "instruments": [{ "id": "synth", "generators": [{ "type": "oscillator" }] }],
        "patterns": [
            { "id": "outer", "bars": 1, "events": [
                { "type": "StartPattern", "beat": 1, "patternId": "inner" }
            ]},
            { "id": "inner", "bars": 1, "events": [
                { "type": "InstrumentOn", "beat": 1, "channelId": "lead", "instrumentId": "synth", "note": "G4", "velocity": 0.7, "duration": 0.5 }
            ]}
        ],
        "sequence": [{ "patternId": "outer", "beat": 0 }]
    }"#;
    let mut seq = playing(json);
    // nested note lands on beat 2
    seq.clock_mut().advance(1.1);

    let triggers = seq.backend().triggers();
    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0].duration, Some(beats_to_time(0.5, 4)));
    assert!((triggers[0].time - 1.0).abs() < 1e-9);
}

#[test]
fn test_refused_effect_aborts_load() {
    let json = r#"{
        "bpm": 120,
        "beatsPerBar": 4,
        "masterChannel": { "effects": [{ "name": "reverb" }] },
        "channels": [{ "id": "lead" }]
    }"#;
    let mut seq = Sequencer::new(
        VirtualClock::default(),
        RecordingBackend::new().refusing_effect("reverb"),
    );
    let err = seq.load_song(load(json)).expect_err("refused effect");

    assert!(matches!(err, SequencerError::Engine(_)));
    assert!(seq.session().is_none());
    assert!(seq.backend().live_nodes().is_empty());

    seq.start();
    assert_eq!(seq.state(), PlaybackState::Stopped);
}

#[test]
fn test_unknown_effect_is_rejected_at_parse() {
    let json = r#"{ "bpm": 120, "beatsPerBar": 4,
        "channels": [{ "id": "lead", "effects": [{ "name": "wah" }] }] }"#;
    assert!(parse_song(json).is_err());
}

#[test]
fn test_loop_turned_off_while_paused_ends_after_resume() {
    let mut song = load(ONE_NOTE);
    song.looping = true;
    let mut seq = Sequencer::new(VirtualClock::default(), RecordingBackend::new());
    seq.load_song(song).expect("load song");
    seq.start();
    seq.clock_mut().advance(0.5);
    seq.pause();

    seq.set_looping(false);
    assert_eq!(seq.state(), PlaybackState::Paused);
    assert_eq!(seq.clock().loop_end_beats(), None);

    seq.resume();
    seq.clock_mut().advance(10.0);
    assert_eq!(seq.poll(), Some(Status::Ended { time: 2.0 }));
    assert_eq!(seq.state(), PlaybackState::Stopped);
    assert_eq!(seq.backend().triggers().len(), 1);
}

#[test]
fn test_loop_turned_on_while_paused_keeps_playing() {
    let mut seq = playing(ONE_NOTE);
    seq.clock_mut().advance(0.5);
    seq.pause();

    seq.set_looping(true);
    assert_eq!(seq.clock().loop_end_beats(), Some(4.0));
    // only the note remains scheduled
    assert_eq!(seq.clock().scheduled_count(), 1);

    seq.resume();
    // from beat 1, ten seconds cross the loop start five times
    seq.clock_mut().advance(10.0);
    assert_eq!(seq.poll(), None);
    assert!(seq.is_playing());
    assert_eq!(seq.backend().triggers().len(), 6);
}
