//! Test doubles shared by the gateway, command, and API tests.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;
use wabot_core::error::BotError;
use wabot_core::message::{InboundMessage, MediaKind, MediaRef, OutgoingMedia, QuotedRef};
use wabot_core::traits::Messenger;

/// A text sent through the mock.
#[derive(Debug, Clone)]
pub struct SentText {
    pub chat: String,
    pub text: String,
    pub quoted: Option<QuotedRef>,
}

/// A media message sent through the mock.
#[derive(Debug, Clone)]
pub struct SentMedia {
    pub chat: String,
    pub media: OutgoingMedia,
}

/// Records outbound traffic and serves canned downloads.
#[derive(Default)]
pub struct MockMessenger {
    pub texts: Mutex<Vec<SentText>>,
    pub media: Mutex<Vec<SentMedia>>,
    /// Bytes returned by `download`; `None` makes it fail.
    pub download_bytes: Option<Vec<u8>>,
    pub dp_url: Option<String>,
    pub dp_lookups: Mutex<Vec<String>>,
}

impl MockMessenger {
    pub fn with_download(bytes: &[u8]) -> Self {
        Self {
            download_bytes: Some(bytes.to_vec()),
            ..Default::default()
        }
    }

    pub fn texts(&self) -> Vec<SentText> {
        self.texts.lock().unwrap().clone()
    }

    pub fn sent_media(&self) -> Vec<SentMedia> {
        self.media.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn send_text(
        &self,
        chat: &str,
        text: &str,
        quoted: Option<&QuotedRef>,
    ) -> Result<String, BotError> {
        let mut texts = self.texts.lock().unwrap();
        texts.push(SentText {
            chat: chat.to_string(),
            text: text.to_string(),
            quoted: quoted.cloned(),
        });
        Ok(format!("SENT{}", texts.len()))
    }

    async fn send_media(&self, chat: &str, media: OutgoingMedia) -> Result<String, BotError> {
        let mut sent = self.media.lock().unwrap();
        sent.push(SentMedia {
            chat: chat.to_string(),
            media,
        });
        Ok(format!("MEDIA{}", sent.len()))
    }

    async fn download(&self, _media: &MediaRef) -> Result<Vec<u8>, BotError> {
        self.download_bytes
            .clone()
            .ok_or_else(|| BotError::Media("download failed".to_string()))
    }

    async fn profile_picture_url(&self, jid: &str) -> Result<Option<String>, BotError> {
        self.dp_lookups.lock().unwrap().push(jid.to_string());
        Ok(self.dp_url.clone())
    }
}

/// A plain text message from `94771234567` in a private chat.
pub fn text_msg(text: &str) -> InboundMessage {
    InboundMessage {
        id: "MSG1".to_string(),
        chat: "94771234567@s.whatsapp.net".to_string(),
        sender: "94771234567@s.whatsapp.net".to_string(),
        push_name: Some("Kasun".to_string()),
        is_from_me: false,
        is_group: false,
        text: text.to_string(),
        media: None,
        view_once: None,
        context: None,
        received_at: Utc::now(),
    }
}

pub fn image_ref(caption: Option<&str>) -> MediaRef {
    let mut media = MediaRef::new(MediaKind::Image);
    media.mimetype = Some("image/jpeg".to_string());
    media.caption = caption.map(str::to_string);
    media.direct_path = Some("/v/t62/abc".to_string());
    media.media_key = Some(vec![7; 32]);
    media
}
