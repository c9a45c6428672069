//! Binary layout of effect cache files.
//!
//! All integers are little-endian.
//!
//! * `info.bin`: a bare sequence of `u32` note indices, read until EOF.
//! * `<index>.bin`: `[u8 key][f32 start][f32 end][u32 trajectories]`, then per trajectory
//!   `[u16 lifetime]` followed by `lifetime` samples of `(u16 frame, u16 x, u16 y)`.

use std::io::{self, Read, Write};

/// Name of the index file inside an effect directory.
pub const INDEX_FILE: &str = "info.bin";

/// Name of the invalidation state file inside an effect directory.
pub const STATE_FILE: &str = "state.json";

/// Size of one index record.
pub const INDEX_RECORD_LEN: usize = 4;

/// Size of an entry header.
pub const HEADER_LEN: usize = 1 + 4 + 4 + 4;

/// Size of one sample.
pub const SAMPLE_LEN: usize = 6;

/// Blob file name of a note.
pub fn entry_file_name(note_index: u32) -> String {
    format!("{note_index}.bin")
}

/// One simulated position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sample {
    pub frame: u16,
    pub x: u16,
    pub y: u16,
}

/// One particle: samples on consecutive frames.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Trajectory {
    pub samples: Vec<Sample>,
}

impl Trajectory {
    /// Stored lifetime, equal to the sample count.
    pub fn lifetime(&self) -> u16 {
        self.samples.len() as u16
    }
}

/// Leading fields of a blob.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntryHeader {
    pub key: u8,
    pub start: f32,
    pub end: f32,
    pub trajectories: u32,
}

impl EntryHeader {
    /// Parse from the first [`HEADER_LEN`] bytes.
    pub fn parse(b: &[u8]) -> Option<Self> {
        let b = b.get(..HEADER_LEN)?;
        Some(Self {
            key: b[0],
            start: f32::from_le_bytes([b[1], b[2], b[3], b[4]]),
            end: f32::from_le_bytes([b[5], b[6], b[7], b[8]]),
            trajectories: u32::from_le_bytes([b[9], b[10], b[11], b[12]]),
        })
    }

    /// Return `true` when `frame` lies in `[start, end + max_lifetime]`.
    pub fn window_contains(&self, frame: f64, max_lifetime: u32) -> bool {
        let start = f64::from(self.start);
        let end = f64::from(self.end) + f64::from(max_lifetime);
        start <= frame && frame <= end
    }
}

/// One note's cache record.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub key: u8,
    pub start: f32,
    pub end: f32,
    pub trajectories: Vec<Trajectory>,
}

/// Serialize an entry. Trajectories longer than `u16::MAX` samples are truncated.
pub fn write_entry<W: Write>(w: &mut W, entry: &CacheEntry) -> io::Result<()> {
    w.write_all(&[entry.key])?;
    w.write_all(&entry.start.to_le_bytes())?;
    w.write_all(&entry.end.to_le_bytes())?;
    w.write_all(&(entry.trajectories.len() as u32).to_le_bytes())?;
    for t in &entry.trajectories {
        let n = t.samples.len().min(usize::from(u16::MAX));
        w.write_all(&(n as u16).to_le_bytes())?;
        for s in &t.samples[..n] {
            w.write_all(&s.frame.to_le_bytes())?;
            w.write_all(&s.x.to_le_bytes())?;
            w.write_all(&s.y.to_le_bytes())?;
        }
    }
    Ok(())
}

/// Parse a whole entry; `None` when the bytes are truncated.
pub fn parse_entry(b: &[u8]) -> Option<CacheEntry> {
    let header = EntryHeader::parse(b)?;
    let mut cur = Cursor::new(&b[HEADER_LEN..]);
    let mut trajectories = Vec::new();
    for _ in 0..header.trajectories {
        let lifetime = cur.u16()?;
        let mut samples = Vec::with_capacity(usize::from(lifetime));
        for _ in 0..lifetime {
            samples.push(cur.sample()?);
        }
        trajectories.push(Trajectory { samples });
    }
    Some(CacheEntry {
        key: header.key,
        start: header.start,
        end: header.end,
        trajectories,
    })
}

/// Append one index record in a single write.
pub fn write_index_record<W: Write>(w: &mut W, note_index: u32) -> io::Result<()> {
    w.write_all(&note_index.to_le_bytes())
}

/// Read all complete index records; a trailing partial record is ignored.
pub fn read_index<R: Read>(r: &mut R) -> io::Result<Vec<u32>> {
    let mut bytes = Vec::new();
    r.read_to_end(&mut bytes)?;
    Ok(bytes
        .chunks_exact(INDEX_RECORD_LEN)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Forward-only reader over blob bytes.
pub(crate) struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub(crate) fn u16(&mut self) -> Option<u16> {
        let b = self.bytes.get(self.pos..self.pos + 2)?;
        self.pos += 2;
        Some(u16::from_le_bytes([b[0], b[1]]))
    }

    pub(crate) fn sample(&mut self) -> Option<Sample> {
        Some(Sample {
            frame: self.u16()?,
            x: self.u16()?,
            y: self.u16()?,
        })
    }

    /// Skip `n` samples without decoding them.
    pub(crate) fn skip_samples(&mut self, n: usize) -> Option<()> {
        let next = self.pos.checked_add(n * SAMPLE_LEN)?;
        if next > self.bytes.len() {
            return None;
        }
        self.pos = next;
        Some(())
    }

    /// Decode sample `i` (0-based) counted from the current position, without moving.
    pub(crate) fn peek_sample(&self, i: usize) -> Option<Sample> {
        let at = self.pos.checked_add(i * SAMPLE_LEN)?;
        let b = self.bytes.get(at..at + SAMPLE_LEN)?;
        Some(Sample {
            frame: u16::from_le_bytes([b[0], b[1]]),
            x: u16::from_le_bytes([b[2], b[3]]),
            y: u16::from_le_bytes([b[4], b[5]]),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/format.rs"]
mod tests;
