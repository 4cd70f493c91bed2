use thiserror::Error;

/// Input that was rejected before any state changed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Task title cannot be empty.")]
    EmptyTitle,

    #[error("Please select a due date and time.")]
    MissingDueDate,

    #[error("The due date cannot be in the past.")]
    DueInPast,

    #[error("Please enter your name to register.")]
    EmptyName,

    #[error("Please enter the name of the exam.")]
    MissingExamName,

    #[error("Please enter a passkey.")]
    EmptyPasskey,
}

/// Errors produced by the local profile store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing file could not be read or written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded for storage.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A stored value exists but does not parse.
    #[error("Corrupted value under {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Top-level error, one variant per failure class the user can see.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Camera unavailable, permission denied, empty capture.
    #[error("Capture failed: {0}")]
    Capture(String),

    /// Group service or assistant call failed.
    #[error("{0}")]
    Remote(String),

    /// Stored profile data could not be parsed.
    #[error("Stored data is corrupted: {0}")]
    CorruptState(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Corrupt { key, reason } => {
                Self::CorruptState(format!("{}: {}", key, reason))
            }
            other => Self::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
