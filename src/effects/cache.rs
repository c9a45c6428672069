use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::ops::Range;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use anyhow::Context;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::effects::fingerprint::{CACHE_FORMAT_VERSION, cache_fingerprint};
use crate::effects::format::{
    Cursor, EntryHeader, HEADER_LEN, INDEX_FILE, STATE_FILE, entry_file_name, read_index,
    write_entry, write_index_record,
};
use crate::effects::simulate::{EffectParams, emission_plan, note_rng, simulate_note};
use crate::foundation::error::{PianovidError, PianovidResult};
use crate::piano::KeyGeometry;
use crate::timeline::Note;

/// One particle to draw on the current frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleSample {
    pub x: u16,
    pub y: u16,
    /// Position on the previous frame, if the particle was alive then.
    pub prev: Option<(u16, u16)>,
    /// `(first + lifetime - frame) / lifetime`, in `(0, 1]`.
    pub fade: f32,
}

/// Receives the particles found for one frame.
pub trait ParticleSink {
    fn particle(&mut self, sample: ParticleSample);
}

impl ParticleSink for Vec<ParticleSample> {
    fn particle(&mut self, sample: ParticleSample) {
        self.push(sample);
    }
}

/// Split `len` notes into at most `workers` contiguous, non-overlapping, non-empty slices.
pub fn partition(len: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    if len == 0 {
        return Vec::new();
    }
    let chunk = len.div_ceil(workers);
    (0..len)
        .step_by(chunk)
        .map(|s| s..(s + chunk).min(len))
        .collect()
}

/// Outcome of a cache build.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheBuildReport {
    /// Notes with a blob on disk.
    pub entries: usize,
    /// Notes that produced no particles (failed star rolls).
    pub skipped: usize,
    /// One message per failed worker slice; its remaining notes have no entry.
    pub failures: Vec<String>,
}

impl CacheBuildReport {
    fn absorb(&mut self, other: CacheBuildReport) {
        self.entries += other.entries;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
    }
}

/// Snapshot of a running build, taken from the directory contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheProgress {
    /// Blobs written so far.
    pub written: usize,
    /// Notes being processed.
    pub notes: usize,
}

struct BuildJob {
    dir: PathBuf,
    params: EffectParams,
    notes: Vec<Note>,
    geometry: KeyGeometry,
    seed: u64,
}

/// Handle of a cache build running on a background thread.
pub struct CacheBuild {
    dir: PathBuf,
    notes: usize,
    handle: JoinHandle<CacheBuildReport>,
}

impl CacheBuild {
    /// Clear `dir` and start simulating `notes` on `workers` threads.
    pub fn spawn(
        dir: impl Into<PathBuf>,
        params: EffectParams,
        notes: Vec<Note>,
        geometry: KeyGeometry,
        seed: u64,
        workers: usize,
    ) -> PianovidResult<Self> {
        let dir = dir.into();
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .with_context(|| format!("clear cache dir '{}'", dir.display()))?;
        }
        fs::create_dir_all(&dir)
            .with_context(|| format!("create cache dir '{}'", dir.display()))?;

        let index = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(INDEX_FILE))
            .with_context(|| format!("open cache index in '{}'", dir.display()))?;
        let pool = build_thread_pool(workers)?;

        let n = notes.len();
        let ranges = partition(n, workers);
        let job = Arc::new(BuildJob {
            dir: dir.clone(),
            params,
            notes,
            geometry,
            seed,
        });
        let index = Arc::new(Mutex::new(index));
        let name = format!("pianovid-cache-{}", job.params.kind.id());

        let handle = std::thread::Builder::new()
            .name(name)
            .spawn(move || {
                let outcomes: Vec<CacheBuildReport> = pool.install(|| {
                    ranges
                        .into_par_iter()
                        .map(|range| run_slice(&job, range, &index))
                        .collect()
                });
                let mut report = CacheBuildReport::default();
                for o in outcomes {
                    report.absorb(o);
                }
                report
            })
            .context("spawn cache build thread")?;

        tracing::debug!(dir = %dir.display(), notes = n, workers, "cache build started");
        Ok(Self {
            dir,
            notes: n,
            handle,
        })
    }

    /// Count blobs on disk. Cheap enough to poll.
    pub fn progress(&self) -> CacheProgress {
        CacheProgress {
            written: count_blobs(&self.dir),
            notes: self.notes,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for every worker.
    pub fn join(self) -> PianovidResult<CacheBuildReport> {
        let report = self
            .handle
            .join()
            .map_err(|_| PianovidError::cache("cache build thread panicked"))?;
        if report.failures.is_empty() {
            tracing::debug!(
                dir = %self.dir.display(),
                entries = report.entries,
                skipped = report.skipped,
                "cache build finished"
            );
        } else {
            tracing::warn!(
                dir = %self.dir.display(),
                failures = report.failures.len(),
                "cache build finished with failed workers"
            );
        }
        Ok(report)
    }
}

/// Build a cache and wait for it.
#[tracing::instrument(skip(params, notes, geometry), fields(effect = %params.kind))]
pub fn build_cache(
    dir: &Path,
    params: &EffectParams,
    notes: &[Note],
    geometry: &KeyGeometry,
    seed: u64,
    workers: usize,
) -> PianovidResult<CacheBuildReport> {
    CacheBuild::spawn(
        dir,
        params.clone(),
        notes.to_vec(),
        geometry.clone(),
        seed,
        workers,
    )?
    .join()
}

fn build_thread_pool(workers: usize) -> PianovidResult<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|e| PianovidError::cache(format!("failed to build rayon thread pool: {e}")))
}

fn run_slice(job: &BuildJob, range: Range<usize>, index: &Mutex<File>) -> CacheBuildReport {
    let label = format!("notes {}..{}", range.start, range.end);
    match catch_unwind(AssertUnwindSafe(|| build_slice(job, range, index))) {
        Ok(Ok(report)) => report,
        Ok(Err((mut report, e))) => {
            report.failures.push(format!("{label}: {e:#}"));
            report
        }
        Err(_) => CacheBuildReport {
            failures: vec![format!("{label}: worker panicked")],
            ..CacheBuildReport::default()
        },
    }
}

type SliceError = (CacheBuildReport, anyhow::Error);

fn build_slice(
    job: &BuildJob,
    range: Range<usize>,
    index: &Mutex<File>,
) -> Result<CacheBuildReport, SliceError> {
    let mut report = CacheBuildReport::default();
    for i in range {
        let note = &job.notes[i];
        let id = i as u32;
        let mut rng = note_rng(job.seed, job.params.kind, id);
        let plan = emission_plan(&mut rng, note, &job.params);
        if plan.is_empty() {
            report.skipped += 1;
            continue;
        }

        if let Err(e) = append_index(index, id) {
            return Err((report, e));
        }
        let entry = simulate_note(&mut rng, note, &plan, &job.params, &job.geometry);
        if let Err(e) = write_blob(&job.dir, id, &entry) {
            return Err((report, e));
        }
        report.entries += 1;
    }
    Ok(report)
}

fn append_index(index: &Mutex<File>, id: u32) -> anyhow::Result<()> {
    let mut f = index
        .lock()
        .map_err(|_| anyhow::anyhow!("cache index lock poisoned"))?;
    write_index_record(&mut *f, id).context("append cache index record")
}

fn write_blob(
    dir: &Path,
    id: u32,
    entry: &crate::effects::format::CacheEntry,
) -> anyhow::Result<()> {
    let path = dir.join(entry_file_name(id));
    let f = File::create(&path).with_context(|| format!("create '{}'", path.display()))?;
    let mut w = BufWriter::new(f);
    write_entry(&mut w, entry).with_context(|| format!("write '{}'", path.display()))?;
    w.flush()
        .with_context(|| format!("flush '{}'", path.display()))?;
    Ok(())
}

fn count_blobs(dir: &Path) -> usize {
    let Ok(rd) = fs::read_dir(dir) else {
        return 0;
    };
    rd.filter_map(Result::ok)
        .filter(|e| {
            let name = e.file_name();
            let name = name.to_string_lossy();
            name.ends_with(".bin") && name != INDEX_FILE
        })
        .count()
}

/// Feed every sample of `frame` found in one blob to `sink`.
///
/// Returns `None` when the blob is truncated; samples found before the cut are still delivered.
fn scan_blob(
    bytes: &[u8],
    header: &EntryHeader,
    frame: u64,
    sink: &mut dyn ParticleSink,
) -> Option<usize> {
    let Ok(frame) = u16::try_from(frame) else {
        return Some(0);
    };
    let mut cur = Cursor::new(bytes.get(HEADER_LEN..)?);
    let mut found = 0;
    for _ in 0..header.trajectories {
        let lifetime = cur.u16()?;
        if lifetime == 0 {
            continue;
        }
        let first = cur.peek_sample(0)?.frame;
        if frame >= first && u32::from(frame) < u32::from(first) + u32::from(lifetime) {
            let i = usize::from(frame - first);
            let s = cur.peek_sample(i)?;
            let prev = if i > 0 {
                cur.peek_sample(i - 1).map(|p| (p.x, p.y))
            } else {
                None
            };
            let fade = (f32::from(first) + f32::from(lifetime) - f32::from(frame))
                / f32::from(lifetime);
            sink.particle(ParticleSample {
                x: s.x,
                y: s.y,
                prev,
                fade,
            });
            found += 1;
        }
        cur.skip_samples(usize::from(lifetime))?;
    }
    Some(found)
}

fn read_index_file(dir: &Path) -> PianovidResult<Option<Vec<u32>>> {
    let path = dir.join(INDEX_FILE);
    let mut f = match File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("open cache index '{}'", path.display()))
                .into());
        }
    };
    let ids = read_index(&mut f)
        .with_context(|| format!("read cache index '{}'", path.display()))?;
    Ok(Some(ids))
}

/// Stream the index of `dir` and draw every particle alive at `frame`.
///
/// Entries are gated on `[start, end + max_lifetime]`. Missing or truncated blobs are skipped.
/// Returns the number of samples delivered.
pub fn render_frame(
    dir: &Path,
    frame: u64,
    max_lifetime: u32,
    sink: &mut dyn ParticleSink,
) -> PianovidResult<usize> {
    let Some(ids) = read_index_file(dir)? else {
        tracing::debug!(dir = %dir.display(), "no cache index, layer skipped");
        return Ok(0);
    };
    let mut found = 0;
    for id in ids {
        let path = dir.join(entry_file_name(id));
        let Ok(bytes) = fs::read(&path) else {
            tracing::debug!(path = %path.display(), "missing cache entry skipped");
            continue;
        };
        let Some(header) = EntryHeader::parse(&bytes) else {
            tracing::debug!(path = %path.display(), "truncated cache entry skipped");
            continue;
        };
        if !header.window_contains(frame as f64, max_lifetime) {
            continue;
        }
        match scan_blob(&bytes, &header, frame, sink) {
            Some(n) => found += n,
            None => tracing::debug!(path = %path.display(), "truncated cache entry skipped"),
        }
    }
    Ok(found)
}

/// Cache directory opened for playback.
///
/// Headers are read once; each frame then only opens the blobs whose window contains it.
#[derive(Clone, Debug)]
pub struct CacheReader {
    dir: PathBuf,
    max_lifetime: u32,
    frame_base: u64,
    entries: Vec<(u32, EntryHeader)>,
}

impl CacheReader {
    pub fn open(dir: impl Into<PathBuf>, max_lifetime: u32) -> PianovidResult<Self> {
        let dir = dir.into();
        let ids = read_index_file(&dir)?.unwrap_or_default();
        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            let path = dir.join(entry_file_name(id));
            let mut buf = [0u8; HEADER_LEN];
            let header = File::open(&path)
                .and_then(|mut f| f.read_exact(&mut buf))
                .ok()
                .and_then(|()| EntryHeader::parse(&buf));
            match header {
                Some(h) => entries.push((id, h)),
                None => tracing::debug!(path = %path.display(), "unreadable cache entry skipped"),
            }
        }
        Ok(Self {
            dir,
            max_lifetime,
            frame_base: 0,
            entries,
        })
    }

    /// Offset added to timeline frames to get the frames stored in the cache.
    pub fn with_frame_base(mut self, frame_base: u64) -> Self {
        self.frame_base = frame_base;
        self
    }

    pub fn frame_base(&self) -> u64 {
        self.frame_base
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of readable entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deliver every particle alive at timeline frame `floor(note_frame)`.
    pub fn render_note_frame(&self, note_frame: f64, sink: &mut dyn ParticleSink) -> usize {
        let frame = note_frame.floor() + self.frame_base as f64;
        if !(frame >= 0.0) {
            return 0;
        }
        self.render_frame(frame as u64, sink)
    }

    /// Deliver every particle alive at cache frame `frame`; returns the sample count.
    pub fn render_frame(&self, frame: u64, sink: &mut dyn ParticleSink) -> usize {
        let mut found = 0;
        for (id, header) in &self.entries {
            if !header.window_contains(frame as f64, self.max_lifetime) {
                continue;
            }
            let path = self.dir.join(entry_file_name(*id));
            let Ok(bytes) = fs::read(&path) else {
                tracing::debug!(path = %path.display(), "missing cache entry skipped");
                continue;
            };
            match scan_blob(&bytes, header, frame, sink) {
                Some(n) => found += n,
                None => tracing::debug!(path = %path.display(), "truncated cache entry skipped"),
            }
        }
        found
    }
}

/// Frames added to every note before simulation so the cache holds no negative frames.
///
/// `0` unless the earliest note starts before frame 0.
pub fn frame_base(notes: &[Note]) -> u64 {
    let first = notes
        .iter()
        .map(|n| n.start_frame)
        .fold(f64::INFINITY, f64::min);
    if first.is_finite() && first < 0.0 {
        (-first.floor()) as u64
    } else {
        0
    }
}

/// `notes` moved `frame_base` frames later.
fn shift_notes(notes: &[Note], frame_base: u64) -> Vec<Note> {
    let d = frame_base as f64;
    notes
        .iter()
        .map(|n| Note {
            start_frame: n.start_frame + d,
            end_frame: n.end_frame + d,
            ..*n
        })
        .collect()
}

/// Contents of `state.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct CacheState {
    format_version: u32,
    effect: String,
    fingerprint: String,
    seed: u64,
    seeded: bool,
    frame_base: u64,
    entries: usize,
}

/// Inputs of a started build, recorded in `state.json` when it succeeds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildStamp {
    pub fingerprint: String,
    pub seed: u64,
    pub frame_base: u64,
}

/// One effect's cache directory under the cache root, with rebuild-on-change.
///
/// Without a configured seed, a build draws one and records it, and later runs fingerprint
/// with the recorded seed; reuse then depends only on the inputs.
#[derive(Clone, Debug)]
pub struct EffectCache {
    root: PathBuf,
    params: EffectParams,
    seed: Option<u64>,
}

impl EffectCache {
    pub fn new(root: impl Into<PathBuf>, params: EffectParams, seed: Option<u64>) -> Self {
        Self {
            root: root.into(),
            params,
            seed,
        }
    }

    /// `<root>/<effect id>`.
    pub fn dir(&self) -> PathBuf {
        self.root.join(self.params.kind.id())
    }

    pub fn params(&self) -> &EffectParams {
        &self.params
    }

    fn read_state(&self) -> Option<CacheState> {
        let f = File::open(self.dir().join(STATE_FILE)).ok()?;
        serde_json::from_reader(std::io::BufReader::new(f)).ok()
    }

    fn stamp(&self, notes: &[Note], geometry: &KeyGeometry, seed: u64) -> BuildStamp {
        let frame_base = frame_base(notes);
        let shifted = shift_notes(notes, frame_base);
        BuildStamp {
            fingerprint: cache_fingerprint(&self.params, geometry, seed, &shifted).to_hex(),
            seed,
            frame_base,
        }
    }

    /// Return `true` when the directory was built from exactly these inputs.
    pub fn is_current(&self, notes: &[Note], geometry: &KeyGeometry) -> bool {
        let Some(state) = self.read_state() else {
            return false;
        };
        if state.format_version != CACHE_FORMAT_VERSION {
            return false;
        }
        let seed = self.seed.unwrap_or(state.seed);
        let stamp = self.stamp(notes, geometry, seed);
        state.fingerprint == stamp.fingerprint && self.dir().join(INDEX_FILE).is_file()
    }

    /// Start a rebuild; `state.json` is written by [`EffectCache::finish`].
    pub fn spawn_build(
        &self,
        notes: &[Note],
        geometry: &KeyGeometry,
        workers: usize,
    ) -> PianovidResult<(CacheBuild, BuildStamp)> {
        let seed = self.seed.unwrap_or_else(rand::random);
        let stamp = self.stamp(notes, geometry, seed);
        let build = CacheBuild::spawn(
            self.dir(),
            self.params.clone(),
            shift_notes(notes, stamp.frame_base),
            geometry.clone(),
            seed,
            workers,
        )?;
        Ok((build, stamp))
    }

    /// Wait for a build and record its stamp when every worker succeeded.
    pub fn finish(&self, build: CacheBuild, stamp: BuildStamp) -> PianovidResult<CacheBuildReport> {
        let report = build.join()?;
        if report.failures.is_empty() {
            let state = CacheState {
                format_version: CACHE_FORMAT_VERSION,
                effect: self.params.kind.id().to_owned(),
                fingerprint: stamp.fingerprint,
                seed: stamp.seed,
                seeded: self.seed.is_some(),
                frame_base: stamp.frame_base,
                entries: report.entries,
            };
            let path = self.dir().join(STATE_FILE);
            let json = serde_json::to_vec_pretty(&state)
                .map_err(|e| PianovidError::serde(e.to_string()))?;
            fs::write(&path, json)
                .with_context(|| format!("write cache state '{}'", path.display()))?;
        }
        Ok(report)
    }

    /// Rebuild unless the cache already matches. Returns the report of a rebuild.
    #[tracing::instrument(skip(self, notes, geometry), fields(effect = %self.params.kind))]
    pub fn ensure(
        &self,
        notes: &[Note],
        geometry: &KeyGeometry,
        workers: usize,
    ) -> PianovidResult<Option<CacheBuildReport>> {
        if self.is_current(notes, geometry) {
            tracing::debug!(dir = %self.dir().display(), "effect cache up to date");
            return Ok(None);
        }
        let (build, stamp) = self.spawn_build(notes, geometry, workers)?;
        let report = self.finish(build, stamp)?;
        tracing::info!(
            effect = %self.params.kind,
            entries = report.entries,
            skipped = report.skipped,
            "effect cache built"
        );
        Ok(Some(report))
    }

    /// Open the directory for playback of `notes`.
    pub fn reader(&self, notes: &[Note]) -> PianovidResult<CacheReader> {
        Ok(CacheReader::open(self.dir(), self.params.max_lifetime())?
            .with_frame_base(frame_base(notes)))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/cache.rs"]
mod tests;
