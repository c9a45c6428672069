use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing::Level;

use pianovid::encode::sink_for_output;
use pianovid::keyboard::{CalibrationQuad, compute_crop, draw_calibration, open_source, save_png};
use pianovid::session::{effect_caches, load_timeline};
use pianovid::{FrameIndex, KeyGeometry, RenderSession, Settings};

#[derive(Parser, Debug)]
#[command(name = "pianovid", version)]
struct Cli {
    /// Log at debug level.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the whole video (MP4 needs `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Build the particle effect caches without rendering.
    Cache(CacheArgs),
    /// Draw the keyboard calibration onto a footage frame.
    CropPreview(CropPreviewArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Settings JSON.
    #[arg(long)]
    settings: PathBuf,

    /// Overrides `output.path`.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Settings JSON.
    #[arg(long)]
    settings: PathBuf,

    /// Output frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct CacheArgs {
    /// Settings JSON.
    #[arg(long)]
    settings: PathBuf,

    /// Rebuild even when the cache is up to date.
    #[arg(long)]
    force: bool,
}

#[derive(Parser, Debug)]
struct CropPreviewArgs {
    /// Settings JSON.
    #[arg(long)]
    settings: PathBuf,

    /// Footage frame index (0-based).
    #[arg(long, default_value_t = 0)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Cache(args) => cmd_cache(args),
        Command::CropPreview(args) => cmd_crop_preview(args),
    }
}

fn read_settings(path: &Path) -> anyhow::Result<Settings> {
    let settings = Settings::from_path(path)
        .with_context(|| format!("load settings '{}'", path.display()))?;
    settings.validate()?;
    Ok(settings)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut settings = read_settings(&args.settings)?;
    if let Some(out) = args.out {
        settings.output.path = out;
    }
    let mut sink = sink_for_output(&settings.output);
    let out = settings.output.path.clone();

    let mut session = RenderSession::new(settings)?;
    let stats = session.render_to(sink.as_mut())?;

    if stats.degraded_frames > 0 {
        tracing::warn!(
            degraded = stats.degraded_frames,
            "some frames were written with failed layers"
        );
    }
    eprintln!("wrote {} frames to {}", stats.frames, out.display());
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let settings = read_settings(&args.settings)?;
    let mut session = RenderSession::new(settings)?;
    let frame = session.render_frame(FrameIndex(args.frame))?;
    save_png(&frame, &args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_cache(args: CacheArgs) -> anyhow::Result<()> {
    let settings = read_settings(&args.settings)?;
    let timeline = load_timeline(&settings)?;
    let geometry = KeyGeometry::from_settings(settings.output.width, &settings.piano)?;
    let notes = timeline.notes();

    for cache in effect_caches(&settings) {
        let kind = cache.params().kind;
        if !args.force && cache.is_current(notes, &geometry) {
            tracing::info!(effect = %kind, "cache up to date");
            continue;
        }

        let (build, stamp) = cache.spawn_build(notes, &geometry, settings.effects.workers)?;
        let mut last_decile = 0;
        while !build.is_finished() {
            std::thread::sleep(Duration::from_millis(200));
            let p = build.progress();
            if p.notes == 0 {
                continue;
            }
            let decile = p.written * 10 / p.notes;
            if decile > last_decile {
                last_decile = decile;
                tracing::info!(effect = %kind, written = p.written, notes = p.notes, "building cache");
            }
        }

        let report = cache.finish(build, stamp)?;
        for failure in &report.failures {
            tracing::warn!(effect = %kind, "{failure}");
        }
        tracing::info!(
            effect = %kind,
            entries = report.entries,
            skipped = report.skipped,
            dir = %cache.dir().display(),
            "cache built"
        );
    }
    Ok(())
}

fn cmd_crop_preview(args: CropPreviewArgs) -> anyhow::Result<()> {
    let settings = read_settings(&args.settings)?;
    let kb = &settings.keyboard;
    let path = kb
        .source
        .as_deref()
        .context("settings have no keyboard.source")?;

    let crop = compute_crop(&CalibrationQuad::from_settings(kb), settings.output.width)?;
    let mut source = open_source(path)?;
    let frame = source.frame(args.frame)?;
    let preview = draw_calibration(frame, &crop);
    save_png(&preview, &args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}
