use thiserror::Error;

/// Failure to turn a backend payload into a view model.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unexpected payload shape: {0}")]
    Json(#[from] serde_json::Error),

    #[error("actor path has no address part: {0:?}")]
    MalformedActorPath(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("error reaching backend: {0}")]
    ErrorReachingBackend(#[source] reqwest::Error),

    #[error("backend answered {0}: {1}")]
    StatusCodeError(reqwest::StatusCode, String),

    #[error("error decoding response: {0}")]
    ErrorDecodingResponse(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not supported: {0}")]
    Unsupported(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
