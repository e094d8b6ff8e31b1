/// Result alias that carries the custom [`PulseVizError`] type.
pub type Result<T> = std::result::Result<T, PulseVizError>;

/// Common error type for the engine crate.
///
/// None of these variants are allowed to stop the frame loop. The visualizer
/// logs them and degrades instead.
#[derive(Debug, thiserror::Error)]
pub enum PulseVizError {
    /// Free-form message, mostly used for poisoned locks.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// A caller handed the engine input it cannot work with.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// The capture backend cannot build an audio graph in this environment.
    #[error("audio capture unavailable: {0}")]
    CaptureUnavailable(String),
    /// The media source has already been attached to a capture graph.
    #[error("media `{0}` is already captured by another audio graph")]
    AlreadyCaptured(String),
    /// The drawing surface rejected an operation.
    #[error("surface error: {0}")]
    Surface(String),
    /// A preset file could not be parsed.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// The fullscreen host refused a request.
    #[error("fullscreen request failed: {0}")]
    Fullscreen(String),
    /// The analyser FFT rejected its buffers.
    #[error("fft error: {0}")]
    Fft(#[from] realfft::FftError),
}

impl PulseVizError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for PulseVizError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for PulseVizError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
