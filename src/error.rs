use thiserror::Error;

/// Failure of one remote call. Always contained by the caller: it turns into
/// a connectivity change or an absent result, never a crash.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{path} returned HTTP {status}")]
    Status {
        path: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("simulated failure: {0}")]
    Simulated(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// A tick envelope that could not be turned into a typed event.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("unknown envelope type {0:?}")]
    UnknownType(String),

    #[error("bad {kind} payload: {source}")]
    Payload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}
