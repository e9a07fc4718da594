use thiserror::Error;

pub type LoaderResult<T> = Result<T, LoaderError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoaderError {
    #[error("invalid time range: from_ms={from_ms}, to_ms={to_ms}")]
    InvalidRange { from_ms: i64, to_ms: i64 },

    #[error("invalid viewport: pixel_width={pixel_width}")]
    InvalidViewport { pixel_width: u32 },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("coverage cache error: {0}")]
    Cache(String),

    #[error("invalid observer: {0}")]
    InvalidObserver(String),
}

/// Failure reported by a data source for one tile fetch.
///
/// Transport and server failures are worth retrying; a malformed response is
/// terminal for the tile that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl FetchError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Server { .. })
    }
}
