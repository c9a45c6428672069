/// Convenience result type used across pianovid.
pub type PianovidResult<T> = Result<T, PianovidError>;

/// Top-level error taxonomy used by the render pipeline.
#[derive(thiserror::Error, Debug)]
pub enum PianovidError {
    /// Invalid user-provided settings or arguments.
    #[error("validation error: {0}")]
    Validation(String),

    /// The MIDI file could not be read or its header/track data is corrupt.
    #[error("midi parse error: {0}")]
    MidiParse(String),

    /// The MIDI data is readable but semantically unusable.
    #[error("invalid midi: {0}")]
    InvalidMidi(String),

    /// Calibration quad is degenerate (singular perspective transform).
    #[error("invalid calibration: {0}")]
    InvalidCalibration(String),

    /// Effect cache could not be built or read.
    #[error("cache error: {0}")]
    Cache(String),

    /// Errors while producing or encoding a frame.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PianovidError {
    /// Build a [`PianovidError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`PianovidError::MidiParse`] value.
    pub fn midi_parse(msg: impl Into<String>) -> Self {
        Self::MidiParse(msg.into())
    }

    /// Build a [`PianovidError::InvalidMidi`] value.
    pub fn invalid_midi(msg: impl Into<String>) -> Self {
        Self::InvalidMidi(msg.into())
    }

    /// Build a [`PianovidError::InvalidCalibration`] value.
    pub fn invalid_calibration(msg: impl Into<String>) -> Self {
        Self::InvalidCalibration(msg.into())
    }

    /// Build a [`PianovidError::Cache`] value.
    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    /// Build a [`PianovidError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`PianovidError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
