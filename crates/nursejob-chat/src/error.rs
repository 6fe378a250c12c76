use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("a conversation needs two distinct, non-empty participants")]
    InvalidParticipants,

    #[error("message text is empty")]
    EmptyMessage,

    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ChatError>;
