use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Invalid message envelope: {0}")]
    InvalidMessage(#[from] serde_json::Error),

    #[error("Message is not valid UTF-8: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn missing_key(key: &str) -> Self {
        Self::MalformedMessage(format!("missing key '{key}'"))
    }

    /// True for errors caused by the message itself rather than the environment.
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::MalformedMessage(_) | Self::InvalidMessage(_) | Self::InvalidEncoding(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
