use thiserror::Error;

/// Top-level error type for wabot.
#[derive(Debug, Error)]
pub enum BotError {
    /// Error from the WhatsApp client library (send, connect, lookup).
    #[error("whatsapp client error: {0}")]
    Client(String),

    /// Media upload, download, or encoding failure.
    #[error("media error: {0}")]
    Media(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Outbound HTTP failure (e.g. fetching a profile picture).
    #[error("http error: {0}")]
    Http(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
