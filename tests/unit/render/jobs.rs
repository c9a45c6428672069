use super::*;
use crate::config::settings::Settings;
use crate::effects::build_cache;
use crate::timeline::{Note, TimelineStats};

fn temp_dir(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "pianovid_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

struct Fixture {
    settings: Settings,
    timeline: Timeline,
    geometry: KeyGeometry,
    params: ParamMap,
}

impl Fixture {
    fn new() -> Self {
        let mut settings = Settings::default();
        settings.output.width = 520;
        settings.output.height = 200;
        let timeline = Timeline::new(
            vec![Note {
                key: 39,
                start_frame: 0.0,
                end_frame: 30.0,
                velocity: 90,
            }],
            TimelineStats::default(),
        );
        let geometry = KeyGeometry::from_settings(520, &settings.piano).unwrap();
        let params = settings.params().unwrap();
        Self {
            settings,
            timeline,
            geometry,
            params,
        }
    }

    fn ctx(&self, frame: u64, note_frame: f64) -> FrameContext<'_> {
        FrameContext {
            frame: FrameIndex(frame),
            note_frame,
            canvas: self.settings.output.canvas(),
            fps: self.settings.output.fps,
            middle_y: self.settings.output.middle_y(),
            timeline: &self.timeline,
            geometry: &self.geometry,
            params: &self.params,
        }
    }
}

fn lit(frame: &RenderFrame) -> usize {
    frame.data().chunks_exact(3).filter(|p| p.iter().any(|v| *v > 0)).count()
}

#[test]
fn sounding_centers_follow_held_notes() {
    let fx = Fixture::new();
    let c = fx.ctx(5, 5.0).sounding_centers(3.0);
    assert_eq!(c.len(), 1);
    assert_eq!(c[0].0, 39);
    assert!((c[0].1 - (fx.geometry.key_center(39) + 3.0)).abs() < 1e-9);
    assert!(fx.ctx(40, 40.0).sounding_centers(0.0).is_empty());
    assert_eq!(fx.ctx(0, 0.0).params.get_f64("blocks.speed"), Some(0.2));
}

#[test]
fn particle_job_draws_only_inside_cached_window() {
    let fx = Fixture::new();
    let params = EffectParams::from_settings(EffectKind::Dots, &fx.settings);
    let dir = temp_dir("particle_job");
    build_cache(&dir, &params, fx.timeline.notes(), &fx.geometry, 11, 2).unwrap();
    let reader = CacheReader::open(&dir, params.max_lifetime()).unwrap();
    let mut job = ParticleJob::new(reader, params);
    assert_eq!(job.name(), "dots");

    let mut f = RenderFrame::new(fx.settings.output.canvas());
    job.run(&fx.ctx(0, -5.0), &mut f).unwrap();
    assert_eq!(lit(&f), 0);

    job.run(&fx.ctx(10, 10.0), &mut f).unwrap();
    assert!(lit(&f) > 0);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn light_bar_and_glare_follow_sounding_notes() {
    let fx = Fixture::new();
    let mut bar = LightBarJob {
        settings: LightBarSettings::default(),
        x_offset: 0.0,
    };
    let mut f = RenderFrame::new(fx.settings.output.canvas());
    bar.run(&fx.ctx(5, 5.0), &mut f).unwrap();
    let cx = fx.geometry.key_center(39).round() as i64;
    assert_eq!(f.get(cx, 99), Some([255; 3]));
    assert_eq!(f.get(cx, 98), Some([255; 3]));
    assert!(f.get(0, 99).unwrap()[0] < 255);

    let mut glare = GlareJob {
        settings: GlareSettings::default(),
        x_offset: 0.0,
    };
    let mut quiet = RenderFrame::new(fx.settings.output.canvas());
    glare.run(&fx.ctx(40, 40.0), &mut quiet).unwrap();
    assert_eq!(lit(&quiet), 0);
    glare.run(&fx.ctx(5, 5.0), &mut quiet).unwrap();
    assert!(quiet.get(cx, 100).unwrap()[0] > 0);
}

#[test]
fn blocks_backdrop_and_octave_jobs() {
    let fx = Fixture::new();
    let mut f = RenderFrame::new(fx.settings.output.canvas());
    let mut lines = OctaveLinesJob { x_offset: 0.0 };
    lines.run(&fx.ctx(0, 0.0), &mut f).unwrap();
    let c1 = fx.geometry.key(3).x.round() as i64;
    assert_eq!(f.get(c1, 10), Some([55; 3]));

    let mut blocks = BlocksJob {
        layout: BlockLayout::from_settings(&fx.settings),
        style: BlocksSettings {
            dim_top: false,
            glow: false,
            border: 0.0,
            ..BlocksSettings::default()
        },
    };
    blocks.run(&fx.ctx(15, 15.0), &mut f).unwrap();
    let x = fx.geometry.key_center(39).round() as i64;
    assert_eq!(f.get(x, 95), Some([195, 165, 50]));

    let mut backdrop = BackdropJob {
        color: Rgb8::gray(7),
    };
    backdrop.run(&fx.ctx(15, 15.0), &mut f).unwrap();
    assert_eq!(f.get(x, 100), Some([7; 3]));
    assert_eq!(f.get(x, 199), Some([7; 3]));
}
