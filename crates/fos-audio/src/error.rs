use thiserror::Error;

/// Errors originating from the audio module.
#[derive(Error, Debug)]
pub enum AudioError {
    /// No audio output device found.
    #[error("No audio output device found")]
    NoOutputDevice,

    /// Device sample format has no conversion path.
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Audio stream error.
    #[error("Audio stream error: {0}")]
    StreamError(String),
}
