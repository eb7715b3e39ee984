use thiserror::Error;

/// Failure reported by a [`crate::RemoteRepo`] call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Missing, expired, or insufficient credentials. Never retried here.
    #[error("not authorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The path already exists on a create-only write, or the prior sha no
    /// longer matches.
    #[error("write conflict on {path}: {detail}")]
    Conflict { path: String, detail: String },

    #[error("rate limited by remote")]
    RateLimited,

    #[error("remote returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("not a file: {0}")]
    NotAFile(String),
}

impl RemoteError {
    pub fn is_auth(&self) -> bool {
        matches!(self, RemoteError::Unauthorized(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, RemoteError::Conflict { .. })
    }
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;
