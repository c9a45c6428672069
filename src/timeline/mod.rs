//! MIDI to frame-indexed note timeline.

pub mod midi;

pub use midi::{TempoState, TimelineStats, build_timeline, parse_midi, stabilize};

/// Number of piano keys; key 0 is A0.
pub const KEY_COUNT: usize = 88;

/// One key press in output frame units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Note {
    /// Piano key index in `0..88`.
    pub key: u8,
    /// Frame of the press (fractional, may be negative with a time offset).
    pub start_frame: f64,
    /// Frame of the release, `>= start_frame`.
    pub end_frame: f64,
    /// Press velocity.
    pub velocity: u8,
}

impl Note {
    pub fn duration_frames(&self) -> f64 {
        self.end_frame - self.start_frame
    }

    /// Return `true` while the key is held at `frame`.
    pub fn is_sounding(&self, frame: f64) -> bool {
        self.start_frame <= frame && frame < self.end_frame
    }
}

/// Notes ordered by start frame, plus what was discarded while building them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Timeline {
    notes: Vec<Note>,
    stats: TimelineStats,
}

impl Timeline {
    /// Wrap notes, sorting them by start frame.
    pub fn new(mut notes: Vec<Note>, stats: TimelineStats) -> Self {
        notes.sort_by(|a, b| a.start_frame.total_cmp(&b.start_frame));
        Self { notes, stats }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn stats(&self) -> TimelineStats {
        self.stats
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Start of the earliest note, or 0 for an empty timeline.
    pub fn first_start(&self) -> f64 {
        self.notes.first().map_or(0.0, |n| n.start_frame)
    }

    /// Latest release, or 0 for an empty timeline.
    pub fn last_end(&self) -> f64 {
        self.notes
            .iter()
            .map(|n| n.end_frame)
            .fold(None, |acc: Option<f64>, e| Some(acc.map_or(e, |a| a.max(e))))
            .unwrap_or(0.0)
    }

    /// Frames between the first press and the last release.
    pub fn span_frames(&self) -> f64 {
        (self.last_end() - self.first_start()).max(0.0)
    }

    /// Notes held at `frame`.
    pub fn sounding_at(&self, frame: f64) -> impl Iterator<Item = &Note> {
        self.notes.iter().filter(move |n| n.is_sounding(frame))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/mod.rs"]
mod tests;
