/// Result alias that carries the custom [`TranscriberError`] type.
pub type Result<T> = std::result::Result<T, TranscriberError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum TranscriberError {
    /// Malformed input events: non-positive duration, negative or non-finite
    /// start time, or a pitch letter outside A–G.
    #[error("invalid timeline: {0}")]
    InvalidTimeline(String),
    /// A numeric argument fell outside its accepted range.
    #[error("{name} out of range: {value} (expected {min}..={max})")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    /// Playback was requested before any decoded audio reached the sink.
    #[error("audio sink is not ready")]
    SinkNotReady,
    /// The uploaded bytes could not be decoded into a playable buffer.
    #[error("decode failed: {0}")]
    Decode(String),
    /// The audio sink failed while a session was running.
    #[error("playback failed: {0}")]
    Playback(String),
    /// Free-form failure that does not belong to a specific subsystem.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around JSON (de)serialisation errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl TranscriberError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub(crate) fn invalid_timeline<T: Into<String>>(msg: T) -> Self {
        Self::InvalidTimeline(msg.into())
    }

    pub(crate) fn decode<T: Into<String>>(msg: T) -> Self {
        Self::Decode(msg.into())
    }
}

impl From<&str> for TranscriberError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for TranscriberError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
