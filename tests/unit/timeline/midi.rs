use super::*;

use midly::num::{u4, u7, u15, u24, u28};
use midly::{Format, Header, TrackEvent};

fn fps30() -> Fps {
    Fps::new(30, 1).unwrap()
}

fn on(delta: u32, key: u8, vel: u8) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Midi {
            channel: u4::new(0),
            message: MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(vel),
            },
        },
    }
}

fn off(delta: u32, key: u8) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Midi {
            channel: u4::new(0),
            message: MidiMessage::NoteOff {
                key: u7::new(key),
                vel: u7::new(0),
            },
        },
    }
}

fn tempo(delta: u32, us: u32) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(us))),
    }
}

fn end(delta: u32) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    }
}

fn encode(tracks: Vec<Vec<TrackEvent<'static>>>) -> Vec<u8> {
    let format = if tracks.len() == 1 {
        Format::SingleTrack
    } else {
        Format::Parallel
    };
    let mut smf = Smf::new(Header::new(format, Timing::Metrical(u15::new(480))));
    smf.tracks = tracks;
    let mut out = Vec::new();
    smf.write_std(&mut out).unwrap();
    out
}

#[test]
fn one_second_note_at_default_tempo() {
    // 960 ticks at 480 tpb and 120 bpm = 1 s.
    let bytes = encode(vec![vec![on(0, 61, 90), off(960, 61), end(0)]]);
    let (notes, stats) = parse_midi(&bytes, fps30(), 0.0).unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].key, 40);
    assert_eq!(notes[0].velocity, 90);
    assert!((notes[0].start_frame - 0.0).abs() < 1e-9);
    assert!((notes[0].end_frame - 30.0).abs() < 1e-9);
    assert_eq!(stats, TimelineStats { files: 1, ..Default::default() });
}

#[test]
fn velocity_zero_note_on_releases() {
    let bytes = encode(vec![vec![on(0, 60, 80), on(480, 60, 0), end(0)]]);
    let (notes, _) = parse_midi(&bytes, fps30(), 0.0).unwrap();
    assert_eq!(notes.len(), 1);
    assert!((notes[0].end_frame - 15.0).abs() < 1e-9);
}

#[test]
fn time_offset_shifts_frames_earlier() {
    let bytes = encode(vec![vec![on(0, 60, 80), off(960, 60), end(0)]]);
    let (notes, _) = parse_midi(&bytes, fps30(), 0.5).unwrap();
    assert!((notes[0].start_frame + 15.0).abs() < 1e-9);
    assert!((notes[0].end_frame - 15.0).abs() < 1e-9);
}

#[test]
fn tempo_change_only_affects_later_notes() {
    let base = encode(vec![vec![on(0, 60, 80), off(480, 60), end(0)]]);
    let changed = encode(vec![vec![
        on(0, 60, 80),
        off(480, 60),
        tempo(0, 1_000_000),
        on(0, 62, 80),
        off(480, 62),
        end(0),
    ]]);
    let (a, _) = parse_midi(&base, fps30(), 0.0).unwrap();
    let (b, _) = parse_midi(&changed, fps30(), 0.0).unwrap();
    assert_eq!(a[0], b[0]);
    // Half a beat at 60 bpm = 1 s = 30 frames.
    assert!((b[1].start_frame - 15.0).abs() < 1e-9);
    assert!((b[1].end_frame - 45.0).abs() < 1e-9);
}

#[test]
fn tempo_map_in_first_track_applies_to_other_tracks() {
    let bytes = encode(vec![
        vec![tempo(0, 1_000_000), end(0)],
        vec![on(0, 60, 80), off(480, 60), end(0)],
    ]);
    let (notes, _) = parse_midi(&bytes, fps30(), 0.0).unwrap();
    assert!((notes[0].end_frame - 30.0).abs() < 1e-9);
}

#[test]
fn unpaired_events_are_counted_not_fatal() {
    let bytes = encode(vec![vec![
        off(0, 64),
        on(0, 60, 80),
        on(10, 60, 80),
        off(10, 60),
        on(0, 65, 80),
        on(0, 10, 80),
        end(0),
    ]]);
    let (notes, stats) = parse_midi(&bytes, fps30(), 0.0).unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(stats.orphan_note_offs, 1);
    assert_eq!(stats.restarted_notes, 1);
    assert_eq!(stats.unterminated_notes, 1);
    assert_eq!(stats.out_of_range_events, 1);
    for n in &notes {
        assert!(n.end_frame >= n.start_frame);
        assert!(usize::from(n.key) < crate::timeline::KEY_COUNT);
    }
}

#[test]
fn corrupt_bytes_are_a_parse_error() {
    let err = parse_midi(b"not a midi file", fps30(), 0.0).unwrap_err();
    assert!(matches!(err, PianovidError::MidiParse(_)));
}

#[test]
fn stabilize_stretches_short_notes_only() {
    let mut notes = vec![
        Note {
            key: 1,
            start_frame: 0.0,
            end_frame: 1.0,
            velocity: 1,
        },
        Note {
            key: 2,
            start_frame: 0.0,
            end_frame: 10.0,
            velocity: 1,
        },
    ];
    let changed = stabilize(
        &mut notes,
        StabilizeSettings {
            threshold_frames: 3.0,
            min_frames: 4.0,
        },
    );
    assert_eq!(changed, 1);
    assert_eq!(notes[0].end_frame, 4.0);
    assert_eq!(notes[1].end_frame, 10.0);
}

#[test]
fn build_timeline_reports_missing_file() {
    let err = build_timeline(&[PathBuf::from("/nonexistent.mid")], fps30(), 0.0, None).unwrap_err();
    assert!(matches!(err, PianovidError::MidiParse(_)));
}
