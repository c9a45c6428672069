use super::*;
use crate::encode::sink::InMemorySink;
use crate::foundation::core::{Canvas, Rgb8};
use crate::keyboard::StillImage;
use midly::num::{u4, u7, u15, u28};
use midly::{Format, Header, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use std::path::PathBuf;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "pianovid_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn midi_event(delta: u32, message: MidiMessage) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Midi {
            channel: u4::new(0),
            message,
        },
    }
}

/// One second note on MIDI key 61 (piano key 40).
fn write_midi(path: &std::path::Path) {
    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(480)),
    ));
    smf.tracks = vec![vec![
        midi_event(
            0,
            MidiMessage::NoteOn {
                key: u7::new(61),
                vel: u7::new(100),
            },
        ),
        midi_event(
            960,
            MidiMessage::NoteOff {
                key: u7::new(61),
                vel: u7::new(0),
            },
        ),
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(midly::MetaMessage::EndOfTrack),
        },
    ]];
    smf.save(path).unwrap();
}

fn settings(dir: &std::path::Path) -> Settings {
    std::fs::create_dir_all(dir).unwrap();
    let midi = dir.join("song.mid");
    write_midi(&midi);
    let mut s = Settings::default();
    s.output.width = 104;
    s.output.height = 60;
    s.output.ending_pause_secs = 0.5;
    s.midi.paths = vec![midi];
    s.effects.cache_dir = dir.join("cache");
    s.effects.seed = Some(3);
    s.effects.workers = 2;
    s.keyboard.crop = [[0.0, 0.0], [52.0, 0.0], [52.0, 10.0], [0.0, 10.0]];
    s.keyboard.mask = 0.0;
    s
}

#[test]
fn session_renders_frames_and_reuses_seeded_caches() {
    let dir = temp_dir("session");
    let s = settings(&dir);

    let mut session = RenderSession::new(s.clone()).unwrap();
    assert_eq!(session.timeline().notes().len(), 1);
    assert_eq!(session.total_frames(), 45);
    assert_eq!(session.cache_reports().len(), 1);
    assert_eq!(session.cache_reports()[0].0, EffectKind::Dots);

    let f = session.render_frame(FrameIndex(15)).unwrap();
    assert_eq!(f.canvas(), Canvas { width: 104, height: 60 });
    assert!(session.render_frame(FrameIndex(45)).is_err());

    let again = RenderSession::new(s).unwrap();
    assert!(again.cache_reports().is_empty());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn keyboard_source_is_drawn_below_the_line() {
    let dir = temp_dir("session_keyboard");
    let mut s = settings(&dir);
    s.effects.dots.enabled = false;
    s.effects.glare.enabled = false;
    s.keyboard.sub_dim = 0.0;
    s.keyboard.mult_dim = 1.0;

    let mut img = RenderFrame::new(Canvas { width: 52, height: 10 });
    img.fill_rows(0, 10, Rgb8::gray(200));
    let src: Box<dyn KeyboardSource> = Box::new(StillImage::from_frame(img));
    let mut session = RenderSession::with_keyboard_source(s, Some(src)).unwrap();
    assert!(session.cache_reports().is_empty());

    let f = session.render_frame(FrameIndex(0)).unwrap();
    // Strip is 104 x 20 starting at the keyboard line (row 30).
    assert_eq!(f.get(50, 35), Some([200; 3]));
    assert_eq!(f.get(50, 45), Some([200; 3]));
    assert_eq!(f.get(50, 55), Some([0; 3]));

    let mut sink = InMemorySink::new();
    let range = FrameRange::new(FrameIndex(40), FrameIndex(45)).unwrap();
    let stats = session.render_range(range, &mut sink).unwrap();
    assert_eq!(stats.frames, 5);
    assert_eq!(sink.frames()[0].0, FrameIndex(40));
    let past = FrameRange::new(FrameIndex(40), FrameIndex(46)).unwrap();
    assert!(session.render_range(past, &mut sink).is_err());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn invalid_settings_and_missing_midi_fail() {
    let dir = temp_dir("session_invalid");
    let mut s = settings(&dir);
    s.output.width = 101;
    assert!(matches!(
        RenderSession::new(s).err(),
        Some(PianovidError::Validation(_))
    ));

    let mut s = settings(&dir);
    s.midi.paths = vec![dir.join("missing.mid")];
    assert!(RenderSession::new(s).is_err());

    std::fs::remove_dir_all(&dir).unwrap();
}
