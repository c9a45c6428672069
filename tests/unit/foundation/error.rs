use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        PianovidError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        PianovidError::midi_parse("x")
            .to_string()
            .contains("midi parse error:")
    );
    assert!(
        PianovidError::invalid_midi("x")
            .to_string()
            .contains("invalid midi:")
    );
    assert!(
        PianovidError::invalid_calibration("x")
            .to_string()
            .contains("invalid calibration:")
    );
    assert!(PianovidError::cache("x").to_string().contains("cache error:"));
    assert!(
        PianovidError::evaluation("x")
            .to_string()
            .contains("evaluation error:")
    );
    assert!(
        PianovidError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = PianovidError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
