//! Outgoing message construction and retry logic.

use tracing::{error, warn};
use wabot_core::error::BotError;
use wabot_core::message::{MediaKind, MediaRef, OutgoingMedia, QuotedRef};
use wacore_binary::jid::Jid;
use waproto::whatsapp::message::{
    AudioMessage, DocumentMessage, ExtendedTextMessage, ImageMessage, StickerMessage, VideoMessage,
};
use waproto::whatsapp::{ContextInfo, Message};
use whatsapp_rust::client::Client;
use whatsapp_rust::download::MediaType;

/// Retry delays for exponential backoff: 500ms, 1s, 2s.
pub(crate) const RETRY_DELAYS_MS: [u64; 3] = [500, 1000, 2000];

/// Send a WhatsApp message with retry and exponential backoff.
///
/// Attempts up to 3 times with delays of 500ms, 1s, 2s between retries.
pub(crate) async fn retry_send(client: &Client, jid: &Jid, msg: Message) -> Result<String, BotError> {
    let mut last_err = None;

    for (attempt, delay_ms) in RETRY_DELAYS_MS.iter().enumerate() {
        match client.send_message(jid.clone(), msg.clone()).await {
            Ok(msg_id) => return Ok(msg_id),
            Err(e) => {
                let attempt_num = attempt + 1;
                if attempt_num < RETRY_DELAYS_MS.len() {
                    warn!(
                        "whatsapp send attempt {attempt_num}/{} failed: {e}, retrying in {delay_ms}ms",
                        RETRY_DELAYS_MS.len()
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(*delay_ms)).await;
                } else {
                    error!(
                        "whatsapp send attempt {attempt_num}/{} failed: {e}, giving up",
                        RETRY_DELAYS_MS.len()
                    );
                }
                last_err = Some(e);
            }
        }
    }

    Err(BotError::Client(format!(
        "whatsapp send failed after {} attempts: {}",
        RETRY_DELAYS_MS.len(),
        last_err.map(|e| e.to_string()).unwrap_or_default()
    )))
}

pub(crate) fn parse_jid(jid: &str) -> Result<Jid, BotError> {
    jid.parse()
        .map_err(|e| BotError::Client(format!("invalid whatsapp JID '{jid}': {e}")))
}

/// Reply bubble pointing at `quoted`.
pub(crate) fn quote_context(quoted: &QuotedRef) -> ContextInfo {
    ContextInfo {
        stanza_id: Some(quoted.id.clone()),
        participant: Some(quoted.participant.clone()),
        quoted_message: Some(Box::new(Message {
            conversation: Some(quoted.text.clone()),
            ..Default::default()
        })),
        ..Default::default()
    }
}

/// Plain text, or extended text when quoting.
pub(crate) fn text_message(text: &str, quoted: Option<&QuotedRef>) -> Message {
    match quoted {
        None => Message {
            conversation: Some(text.to_string()),
            ..Default::default()
        },
        Some(q) => Message {
            extended_text_message: Some(Box::new(ExtendedTextMessage {
                text: Some(text.to_string()),
                context_info: Some(Box::new(quote_context(q))),
                ..Default::default()
            })),
            ..Default::default()
        },
    }
}

pub(crate) fn media_type(kind: MediaKind) -> MediaType {
    match kind {
        MediaKind::Image => MediaType::Image,
        MediaKind::Video => MediaType::Video,
        MediaKind::Audio => MediaType::Audio,
        MediaKind::Document => MediaType::Document,
        MediaKind::Sticker => MediaType::Sticker,
    }
}

/// Upload result fields needed to reference the blob in a message.
pub(crate) struct UploadedBlob {
    pub url: String,
    pub direct_path: String,
    pub media_key: Vec<u8>,
    pub file_enc_sha256: Vec<u8>,
    pub file_sha256: Vec<u8>,
    pub file_length: u64,
}

/// Build the media message referencing an uploaded blob.
pub(crate) fn media_message(media: &OutgoingMedia, blob: UploadedBlob) -> Message {
    let context_info = media.quoted.as_ref().map(|q| Box::new(quote_context(q)));
    let mimetype = Some(media.mimetype.clone());
    let caption = media.caption.clone();

    match media.kind {
        MediaKind::Image => Message {
            image_message: Some(Box::new(ImageMessage {
                mimetype,
                caption,
                url: Some(blob.url),
                direct_path: Some(blob.direct_path),
                media_key: Some(blob.media_key),
                file_enc_sha256: Some(blob.file_enc_sha256),
                file_sha256: Some(blob.file_sha256),
                file_length: Some(blob.file_length),
                context_info,
                ..Default::default()
            })),
            ..Default::default()
        },
        MediaKind::Video => Message {
            video_message: Some(Box::new(VideoMessage {
                mimetype,
                caption,
                url: Some(blob.url),
                direct_path: Some(blob.direct_path),
                media_key: Some(blob.media_key),
                file_enc_sha256: Some(blob.file_enc_sha256),
                file_sha256: Some(blob.file_sha256),
                file_length: Some(blob.file_length),
                context_info,
                ..Default::default()
            })),
            ..Default::default()
        },
        MediaKind::Audio => Message {
            audio_message: Some(Box::new(AudioMessage {
                mimetype,
                url: Some(blob.url),
                direct_path: Some(blob.direct_path),
                media_key: Some(blob.media_key),
                file_enc_sha256: Some(blob.file_enc_sha256),
                file_sha256: Some(blob.file_sha256),
                file_length: Some(blob.file_length),
                context_info,
                ..Default::default()
            })),
            ..Default::default()
        },
        MediaKind::Document => Message {
            document_message: Some(Box::new(DocumentMessage {
                mimetype,
                caption,
                file_name: media.file_name.clone(),
                url: Some(blob.url),
                direct_path: Some(blob.direct_path),
                media_key: Some(blob.media_key),
                file_enc_sha256: Some(blob.file_enc_sha256),
                file_sha256: Some(blob.file_sha256),
                file_length: Some(blob.file_length),
                context_info,
                ..Default::default()
            })),
            ..Default::default()
        },
        MediaKind::Sticker => Message {
            sticker_message: Some(Box::new(StickerMessage {
                mimetype,
                url: Some(blob.url),
                direct_path: Some(blob.direct_path),
                media_key: Some(blob.media_key),
                file_enc_sha256: Some(blob.file_enc_sha256),
                file_sha256: Some(blob.file_sha256),
                file_length: Some(blob.file_length),
                context_info,
                ..Default::default()
            })),
            ..Default::default()
        },
    }
}

/// Download and decrypt the blob a [`MediaRef`] points at.
///
/// The library downloads from a protocol media message, so one is rebuilt
/// from the stored fields.
pub(crate) async fn download_media(client: &Client, media: &MediaRef) -> Result<Vec<u8>, BotError> {
    if media.direct_path.is_none() && media.url.is_none() {
        return Err(BotError::Media("media has no download path".into()));
    }
    if media.media_key.is_none() {
        return Err(BotError::Media("media has no media key".into()));
    }

    let result = match media.kind {
        MediaKind::Image => {
            let msg = ImageMessage {
                mimetype: media.mimetype.clone(),
                url: media.url.clone(),
                direct_path: media.direct_path.clone(),
                media_key: media.media_key.clone(),
                file_sha256: media.file_sha256.clone(),
                file_enc_sha256: media.file_enc_sha256.clone(),
                file_length: media.file_length,
                ..Default::default()
            };
            client.download(&msg).await
        }
        MediaKind::Video => {
            let msg = VideoMessage {
                mimetype: media.mimetype.clone(),
                url: media.url.clone(),
                direct_path: media.direct_path.clone(),
                media_key: media.media_key.clone(),
                file_sha256: media.file_sha256.clone(),
                file_enc_sha256: media.file_enc_sha256.clone(),
                file_length: media.file_length,
                ..Default::default()
            };
            client.download(&msg).await
        }
        MediaKind::Audio => {
            let msg = AudioMessage {
                mimetype: media.mimetype.clone(),
                url: media.url.clone(),
                direct_path: media.direct_path.clone(),
                media_key: media.media_key.clone(),
                file_sha256: media.file_sha256.clone(),
                file_enc_sha256: media.file_enc_sha256.clone(),
                file_length: media.file_length,
                ..Default::default()
            };
            client.download(&msg).await
        }
        MediaKind::Document => {
            let msg = DocumentMessage {
                mimetype: media.mimetype.clone(),
                url: media.url.clone(),
                direct_path: media.direct_path.clone(),
                media_key: media.media_key.clone(),
                file_sha256: media.file_sha256.clone(),
                file_enc_sha256: media.file_enc_sha256.clone(),
                file_length: media.file_length,
                ..Default::default()
            };
            client.download(&msg).await
        }
        MediaKind::Sticker => {
            let msg = StickerMessage {
                mimetype: media.mimetype.clone(),
                url: media.url.clone(),
                direct_path: media.direct_path.clone(),
                media_key: media.media_key.clone(),
                file_sha256: media.file_sha256.clone(),
                file_enc_sha256: media.file_enc_sha256.clone(),
                file_length: media.file_length,
                ..Default::default()
            };
            client.download(&msg).await
        }
    };

    result.map_err(|e| BotError::Media(format!("whatsapp {:?} download failed: {e}", media.kind)))
}
