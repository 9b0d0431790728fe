use crate::{
    error::BotError,
    message::{MediaRef, OutgoingMedia, QuotedRef},
};
use async_trait::async_trait;

/// Outbound side of a WhatsApp session.
///
/// The protocol client implements this; handlers only ever see the trait,
/// which keeps them testable without a live connection.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a text message, optionally quoting another message.
    /// Returns the sent message ID.
    async fn send_text(
        &self,
        chat: &str,
        text: &str,
        quoted: Option<&QuotedRef>,
    ) -> Result<String, BotError>;

    /// Upload and send a media message. Returns the sent message ID.
    async fn send_media(&self, chat: &str, media: OutgoingMedia) -> Result<String, BotError>;

    /// Download and decrypt a media blob.
    async fn download(&self, media: &MediaRef) -> Result<Vec<u8>, BotError>;

    /// Full-size profile picture URL for `jid`, `None` when there is no
    /// picture or it is hidden by privacy settings.
    async fn profile_picture_url(&self, jid: &str) -> Result<Option<String>, BotError>;
}
