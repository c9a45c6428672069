use super::*;

#[test]
fn defaults_validate() {
    Settings::default().validate().unwrap();
}

#[test]
fn partial_document_fills_defaults() {
    let json = r#"{
        "output": { "width": 640, "height": 360, "fps": { "num": 25, "den": 1 } },
        "effects": { "stars": { "enabled": true } }
    }"#;
    let s = Settings::from_reader(json.as_bytes()).unwrap();
    assert_eq!(s.output.width, 640);
    assert_eq!(s.output.fps.as_f64(), 25.0);
    assert_eq!(s.output.middle_fac, 0.5);
    assert!(s.effects.stars.enabled);
    assert!(s.effects.stars.style.is_none());
    assert!(s.effects.dots.enabled);
    s.validate().unwrap();
}

#[test]
fn unknown_fields_are_rejected() {
    let err = Settings::from_reader(r#"{ "output": { "widht": 1 } }"#.as_bytes()).unwrap_err();
    assert!(err.to_string().starts_with("validation error:"));
}

#[test]
fn validation_catches_bad_ranges() {
    let mut s = Settings::default();
    s.output.middle_fac = 1.0;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.effects.workers = 0;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.effects.smoke.probability = 1.5;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.output.fps = Fps { num: 30, den: 0 };
    assert!(s.validate().is_err());
}

#[test]
fn style_names_are_uppercase() {
    let s: ParticleStyle = serde_json::from_str("\"BOUNCING\"").unwrap();
    assert_eq!(s, ParticleStyle::Bouncing);
}

#[test]
fn params_exposes_dotted_names() {
    let p = Settings::default().params().unwrap();
    assert_eq!(p.get_f64("keyboard.mask"), Some(200.0));
    assert_eq!(p.get_f64("effects.glare.radius"), Some(75.0));
    assert_eq!(p.get_str("output.format"), Some("video"));
    assert!(p.get("effects.seed").is_none());
}

#[test]
fn from_path_reports_missing_file() {
    let err = Settings::from_path("/nonexistent/pianovid.json").unwrap_err();
    assert!(err.to_string().contains("open settings JSON"));
}
