use thiserror::Error;

/// Failures surfaced by the messaging core. All of them are recovered at the
/// operation boundary and none leaves the store partially written.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("ad not found")]
    AdNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("invalid conversation participants")]
    InvalidParticipants,

    #[error("message must contain text or images")]
    EmptyMessage,

    #[error("message content too long")]
    ContentTooLong,

    #[error("image upload failed: {0}")]
    ImageUploadFailed(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
