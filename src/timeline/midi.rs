use std::path::{Path, PathBuf};

use anyhow::Context;
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};

use crate::config::settings::StabilizeSettings;
use crate::foundation::core::Fps;
use crate::foundation::error::{PianovidError, PianovidResult};
use crate::timeline::{KEY_COUNT, Note, Timeline};

/// Tempo used until the first tempo meta event (120 bpm).
pub const DEFAULT_US_PER_BEAT: u32 = 500_000;

/// MIDI note number of the lowest piano key (A0).
pub const LOWEST_MIDI_NOTE: u8 = 21;

/// Running tick-to-frame conversion state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TempoState {
    /// Ticks per quarter note, or ticks per second for SMPTE timing.
    pub ticks_per_beat: f64,
    /// Microseconds per quarter note.
    pub us_per_beat: f64,
    /// SMPTE timing ignores tempo events.
    pub timecode: bool,
}

impl TempoState {
    fn from_timing(timing: Timing) -> PianovidResult<Self> {
        match timing {
            Timing::Metrical(tpb) => {
                let tpb = tpb.as_int();
                if tpb == 0 {
                    return Err(PianovidError::invalid_midi("ticks per beat is 0"));
                }
                Ok(Self {
                    ticks_per_beat: f64::from(tpb),
                    us_per_beat: f64::from(DEFAULT_US_PER_BEAT),
                    timecode: false,
                })
            }
            Timing::Timecode(fps, subframes) => {
                let ticks_per_sec = f64::from(fps.as_f32()) * f64::from(subframes);
                if !(ticks_per_sec > 0.0) {
                    return Err(PianovidError::invalid_midi("timecode resolution is 0"));
                }
                // One "beat" of one second keeps the frame formula uniform.
                Ok(Self {
                    ticks_per_beat: ticks_per_sec,
                    us_per_beat: 1e6,
                    timecode: true,
                })
            }
        }
    }

    fn set_tempo(&mut self, us_per_beat: u32) {
        if !self.timecode {
            self.us_per_beat = f64::from(us_per_beat);
        }
    }

    /// Output frames spanned by `ticks` at the current tempo.
    pub fn ticks_to_frames(&self, ticks: u64, fps: f64) -> f64 {
        ticks as f64 / self.ticks_per_beat * self.us_per_beat / 1e6 * fps
    }
}

/// Irregularities seen while pairing note events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimelineStats {
    /// MIDI files parsed.
    pub files: usize,
    /// `note_off` events without a held key; ignored.
    pub orphan_note_offs: usize,
    /// Keys still held at end of file; dropped.
    pub unterminated_notes: usize,
    /// Presses on an already held key; the earlier press is dropped.
    pub restarted_notes: usize,
    /// Note events outside the 88-key range; ignored.
    pub out_of_range_events: usize,
    /// Notes lengthened by the stabilization policy.
    pub stabilized_notes: usize,
}

impl TimelineStats {
    fn absorb(&mut self, other: Self) {
        self.files += other.files;
        self.orphan_note_offs += other.orphan_note_offs;
        self.unterminated_notes += other.unterminated_notes;
        self.restarted_notes += other.restarted_notes;
        self.out_of_range_events += other.out_of_range_events;
        self.stabilized_notes += other.stabilized_notes;
    }
}

enum KeyEvent {
    Press(u8),
    Release,
}

/// Convert one in-memory MIDI file to notes.
///
/// Events of all tracks are merged by absolute tick; ties keep track order. The frame counter
/// starts at `-fps * time_offset_secs`.
pub fn parse_midi(
    bytes: &[u8],
    fps: Fps,
    time_offset_secs: f64,
) -> PianovidResult<(Vec<Note>, TimelineStats)> {
    let smf = Smf::parse(bytes).map_err(|e| PianovidError::midi_parse(e.to_string()))?;
    let mut tempo = TempoState::from_timing(smf.header.timing)?;
    let fps = fps.as_f64();

    let mut events = Vec::new();
    for track in &smf.tracks {
        let mut tick = 0u64;
        for ev in track {
            tick += u64::from(ev.delta.as_int());
            events.push((tick, ev.kind));
        }
    }
    events.sort_by_key(|(tick, _)| *tick);

    let mut stats = TimelineStats {
        files: 1,
        ..TimelineStats::default()
    };
    let mut pending: [Option<(f64, u8)>; KEY_COUNT] = [None; KEY_COUNT];
    let mut notes = Vec::new();
    let mut frame = -fps * time_offset_secs;
    let mut last_tick = 0u64;

    for (tick, kind) in events {
        frame += tempo.ticks_to_frames(tick - last_tick, fps);
        last_tick = tick;

        let (midi_key, ev) = match kind {
            TrackEventKind::Meta(MetaMessage::Tempo(t)) => {
                tempo.set_tempo(t.as_int());
                continue;
            }
            TrackEventKind::Midi {
                message: MidiMessage::NoteOn { key, vel },
                ..
            } if vel.as_int() > 0 => (key.as_int(), KeyEvent::Press(vel.as_int())),
            TrackEventKind::Midi {
                message: MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. },
                ..
            } => (key.as_int(), KeyEvent::Release),
            _ => continue,
        };

        let Some(key) = midi_key
            .checked_sub(LOWEST_MIDI_NOTE)
            .filter(|k| usize::from(*k) < KEY_COUNT)
        else {
            stats.out_of_range_events += 1;
            continue;
        };
        let slot = &mut pending[usize::from(key)];

        match ev {
            KeyEvent::Press(velocity) => {
                if slot.is_some() {
                    stats.restarted_notes += 1;
                }
                *slot = Some((frame, velocity));
            }
            KeyEvent::Release => match slot.take() {
                Some((start, velocity)) => notes.push(Note {
                    key,
                    start_frame: start,
                    end_frame: frame,
                    velocity,
                }),
                None => stats.orphan_note_offs += 1,
            },
        }
    }

    stats.unterminated_notes = pending.iter().filter(|p| p.is_some()).count();
    Ok((notes, stats))
}

/// Stretch every note shorter than `threshold_frames` to exactly `min_frames`.
///
/// Returns the number of notes changed.
pub fn stabilize(notes: &mut [Note], policy: StabilizeSettings) -> usize {
    let mut changed = 0;
    for n in notes.iter_mut() {
        if n.end_frame - n.start_frame < policy.threshold_frames {
            n.end_frame = n.start_frame + policy.min_frames;
            changed += 1;
        }
    }
    changed
}

/// Build the note timeline from MIDI files, concatenated in order.
#[tracing::instrument(skip(paths))]
pub fn build_timeline(
    paths: &[PathBuf],
    fps: Fps,
    time_offset_secs: f64,
    stabilize_policy: Option<StabilizeSettings>,
) -> PianovidResult<Timeline> {
    let mut notes = Vec::new();
    let mut stats = TimelineStats::default();

    for path in paths {
        let (file_notes, file_stats) = parse_midi(&read_midi(path)?, fps, time_offset_secs)
            .map_err(|e| match e {
                PianovidError::MidiParse(msg) => {
                    PianovidError::midi_parse(format!("{}: {msg}", path.display()))
                }
                other => other,
            })?;
        tracing::debug!(path = %path.display(), notes = file_notes.len(), "parsed midi file");
        notes.extend(file_notes);
        stats.absorb(file_stats);
    }

    if let Some(policy) = stabilize_policy {
        stats.stabilized_notes = stabilize(&mut notes, policy);
    }
    notes.sort_by(|a, b| a.start_frame.total_cmp(&b.start_frame));

    if stats.orphan_note_offs > 0 || stats.unterminated_notes > 0 || stats.restarted_notes > 0 {
        tracing::warn!(
            orphan_note_offs = stats.orphan_note_offs,
            unterminated_notes = stats.unterminated_notes,
            restarted_notes = stats.restarted_notes,
            "unpaired note events ignored"
        );
    }
    tracing::info!(notes = notes.len(), files = stats.files, "timeline built");

    Ok(Timeline::new(notes, stats))
}

fn read_midi(path: &Path) -> PianovidResult<Vec<u8>> {
    std::fs::read(path)
        .with_context(|| format!("read midi file '{}'", path.display()))
        .map_err(|e| PianovidError::midi_parse(format!("{e:#}")))
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/midi.rs"]
mod tests;
