use super::*;

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

#[test]
fn time_mapping_scales_and_clamps() {
    assert_eq!(source_frame_index(0.0, 30.0, 0.0, 60.0), 0);
    assert_eq!(source_frame_index(15.0, 30.0, 0.0, 60.0), 30);
    assert_eq!(source_frame_index(15.0, 30.0, 2.0, 25.0), 62);
    assert_eq!(source_frame_index(-90.0, 30.0, 1.0, 30.0), 0);
}

#[test]
fn still_image_serves_every_frame() {
    let dir = temp_dir("still_image");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("kb.png");
    let mut img = image::RgbImage::new(6, 4);
    img.put_pixel(5, 3, image::Rgb([1, 2, 3]));
    img.save(&path).unwrap();

    let mut src = open_source(&path).unwrap();
    assert_eq!(src.fps(), None);
    assert_eq!(src.size(), (6, 4));
    assert_eq!(src.frame(0).unwrap().get(5, 3), Some([1, 2, 3]));
    assert_eq!(src.frame(500).unwrap().get(5, 3), Some([1, 2, 3]));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn video_reader_seeks_forward_and_back() {
    if !crate::encode::ffmpeg::is_ffmpeg_on_path() || !crate::encode::ffmpeg::is_ffprobe_on_path()
    {
        return;
    }
    let dir = temp_dir("video_reader");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("kb.mp4");
    let status = Command::new("ffmpeg")
        .args([
            "-v",
            "error",
            "-y",
            "-f",
            "lavfi",
            "-i",
            "testsrc=size=32x16:rate=10:duration=2",
            "-pix_fmt",
            "yuv420p",
        ])
        .arg(&path)
        .status()
        .unwrap();
    assert!(status.success());

    let mut reader = VideoReader::open(&path).unwrap();
    assert_eq!(reader.size(), (32, 16));
    assert_eq!(reader.fps(), Some(10.0));
    let f5 = reader.frame(5).unwrap().clone();
    let f2 = reader.frame(2).unwrap().clone();
    assert_eq!(reader.frame(5).unwrap(), &f5);
    assert_ne!(f2, f5);
    assert!(reader.frame(1_000).is_err());

    drop(reader);
    std::fs::remove_dir_all(&dir).unwrap();
}
