//! `Messenger` implementation backed by the live `whatsapp-rust` client.

use super::send::{download_media, media_message, media_type, parse_jid, retry_send, text_message, UploadedBlob};
use super::WhatsAppSession;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};
use wabot_core::error::BotError;
use wabot_core::message::{MediaRef, OutgoingMedia, QuotedRef};
use wabot_core::traits::Messenger;
use whatsapp_rust::client::Client;

impl WhatsAppSession {
    /// Clone the current client handle without holding the lock across awaits.
    async fn connected_client(&self) -> Result<Arc<Client>, BotError> {
        self.client
            .lock()
            .await
            .clone()
            .ok_or_else(|| BotError::Client("whatsapp client not connected".into()))
    }
}

#[async_trait]
impl Messenger for WhatsAppSession {
    async fn send_text(
        &self,
        chat: &str,
        text: &str,
        quoted: Option<&QuotedRef>,
    ) -> Result<String, BotError> {
        let client = self.connected_client().await?;
        let jid = parse_jid(chat)?;

        let msg_id = retry_send(&client, &jid, text_message(text, quoted)).await?;
        // Track sent message ID to ignore our own echo.
        self.sent_ids.lock().await.insert(msg_id.clone());
        Ok(msg_id)
    }

    async fn send_media(&self, chat: &str, mut media: OutgoingMedia) -> Result<String, BotError> {
        let client = self.connected_client().await?;
        let jid = parse_jid(chat)?;

        let data = std::mem::take(&mut media.data);
        let size = data.len();
        let upload = client
            .upload(data, media_type(media.kind))
            .await
            .map_err(|e| BotError::Media(format!("whatsapp {:?} upload failed: {e}", media.kind)))?;
        debug!("uploaded {:?} ({size} bytes)", media.kind);

        let blob = UploadedBlob {
            url: upload.url,
            direct_path: upload.direct_path,
            media_key: upload.media_key,
            file_enc_sha256: upload.file_enc_sha256,
            file_sha256: upload.file_sha256,
            file_length: upload.file_length,
        };

        let msg_id = retry_send(&client, &jid, media_message(&media, blob)).await?;
        self.sent_ids.lock().await.insert(msg_id.clone());
        Ok(msg_id)
    }

    async fn download(&self, media: &MediaRef) -> Result<Vec<u8>, BotError> {
        let client = self.connected_client().await?;
        let bytes = download_media(&client, media).await?;
        info!("downloaded whatsapp {:?} ({} bytes)", media.kind, bytes.len());
        Ok(bytes)
    }

    async fn profile_picture_url(&self, jid: &str) -> Result<Option<String>, BotError> {
        let client = self.connected_client().await?;
        let target = parse_jid(jid)?;

        let picture = client
            .contacts()
            .get_profile_picture(&target, false)
            .await
            .map_err(|e| BotError::Client(format!("profile picture lookup for {jid} failed: {e}")))?;

        Ok(picture.map(|p| p.url))
    }
}
