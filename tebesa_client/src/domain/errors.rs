use thiserror::Error;

// A single identity-provider step failed. The session absorbs these.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider rejected the request: {0}")]
    Rejected(String),
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
    #[error("identity provider returned an empty user id")]
    EmptyUserId,
}

// Document store I/O failure, surfaced to the caller without retry.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    #[error("document store rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("document could not be decoded: {0}")]
    Decode(String),
    #[error("document subscription closed")]
    Closed,
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

// Errors returned by the profile accessor and message channel.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("session is not ready")]
    SessionNotReady,
    #[error(transparent)]
    Store(#[from] StoreError),
}

// Input refused before it reaches the store. Not an error for the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("message text is empty")]
    EmptyText,
}
