//! Translation of decrypted WhatsApp messages into library-agnostic
//! [`BotEvent`]s.

use tracing::debug;
use wabot_core::message::{BotEvent, InboundMessage, MediaKind, MediaRef, MessageContext, Revocation};
use wacore::types::message::MessageInfo;
use waproto::whatsapp::message::protocol_message;
use waproto::whatsapp::{ContextInfo, Message};

/// Envelopes are peeled at most this many levels deep.
const MAX_ENVELOPE_DEPTH: usize = 4;

/// Content extracted from a protocol message.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct ParsedContent {
    pub text: String,
    pub media: Option<MediaRef>,
    pub view_once: Option<MediaRef>,
    pub context: Option<MessageContext>,
}

impl ParsedContent {
    fn is_empty(&self) -> bool {
        self.text.is_empty() && self.media.is_none() && self.view_once.is_none()
    }
}

/// Translate a decrypted message event. Returns `None` for content the bot
/// has no use for (receipts, reactions, key distribution, ...).
pub(crate) fn translate_message(msg: &Message, info: &MessageInfo) -> Option<BotEvent> {
    let chat = info.source.chat.to_string();
    let sender = info.source.sender.to_string();

    if let Some(deleted_id) = revoked_message_id(msg) {
        return Some(BotEvent::Revoked(Revocation {
            chat,
            sender,
            message_id: deleted_id,
        }));
    }

    let content = parse_content(msg);
    if content.is_empty() {
        debug!("WA msg {} has no usable content", info.id);
        return None;
    }

    debug!(
        "WA msg: is_group={}, is_from_me={}, sender={}, chat={}",
        info.source.is_group, info.source.is_from_me, sender, chat,
    );

    Some(BotEvent::Message(Box::new(InboundMessage {
        id: info.id.clone(),
        chat,
        sender,
        push_name: (!info.push_name.is_empty()).then(|| info.push_name.clone()),
        is_from_me: info.source.is_from_me,
        is_group: info.source.is_group,
        text: content.text,
        media: content.media,
        view_once: content.view_once,
        context: content.context,
        received_at: chrono::Utc::now(),
    })))
}

/// ID of the message a REVOKE protocol message deletes.
pub(crate) fn revoked_message_id(msg: &Message) -> Option<String> {
    let protocol = unwrap_envelopes(msg).protocol_message.as_ref()?;
    if protocol.r#type != Some(protocol_message::Type::Revoke as i32) {
        return None;
    }
    protocol.key.as_ref().and_then(|k| k.id.clone())
}

/// Extract text, media, view-once media and reply context.
pub(crate) fn parse_content(msg: &Message) -> ParsedContent {
    let inner = unwrap_envelopes(msg);

    let text = inner
        .conversation
        .as_deref()
        .or_else(|| {
            inner
                .extended_text_message
                .as_ref()
                .and_then(|e| e.text.as_deref())
        })
        .unwrap_or("")
        .to_string();

    let (media, view_once) = match view_once_inner(inner) {
        Some(wrapped) => (None, media_ref(unwrap_envelopes(wrapped))),
        None => {
            let media = media_ref(inner);
            if has_view_once_flag(inner) {
                (None, media)
            } else {
                (media, None)
            }
        }
    };

    ParsedContent {
        text,
        media,
        view_once,
        context: context_info(inner).map(message_context),
    }
}

/// Peel device-sent and ephemeral wrappers.
fn unwrap_envelopes(msg: &Message) -> &Message {
    let mut current = msg;
    for _ in 0..MAX_ENVELOPE_DEPTH {
        let next = current
            .device_sent_message
            .as_ref()
            .and_then(|d| d.message.as_deref())
            .or_else(|| {
                current
                    .ephemeral_message
                    .as_ref()
                    .and_then(|e| e.message.as_deref())
            });
        match next {
            Some(inner) => current = inner,
            None => break,
        }
    }
    current
}

/// Inner message of any view-once envelope version.
fn view_once_inner(msg: &Message) -> Option<&Message> {
    msg.view_once_message
        .as_ref()
        .and_then(|v| v.message.as_deref())
        .or_else(|| {
            msg.view_once_message_v2
                .as_ref()
                .and_then(|v| v.message.as_deref())
        })
        .or_else(|| {
            msg.view_once_message_v2_extension
                .as_ref()
                .and_then(|v| v.message.as_deref())
        })
}

/// Newer clients mark view-once media with a flag instead of an envelope.
fn has_view_once_flag(msg: &Message) -> bool {
    msg.image_message
        .as_ref()
        .and_then(|m| m.view_once)
        .or_else(|| msg.video_message.as_ref().and_then(|m| m.view_once))
        .unwrap_or(false)
}

/// Copies the download fields shared by every media message type.
macro_rules! media_fields {
    ($m:expr, $kind:expr) => {{
        let mut media = MediaRef::new($kind);
        media.mimetype = $m.mimetype.clone();
        media.url = $m.url.clone();
        media.direct_path = $m.direct_path.clone();
        media.media_key = $m.media_key.clone();
        media.file_sha256 = $m.file_sha256.clone();
        media.file_enc_sha256 = $m.file_enc_sha256.clone();
        media.file_length = $m.file_length;
        media
    }};
}

/// First downloadable media payload of a message.
pub(crate) fn media_ref(msg: &Message) -> Option<MediaRef> {
    if let Some(ref img) = msg.image_message {
        let mut media = media_fields!(img, MediaKind::Image);
        media.caption = img.caption.clone();
        return Some(media);
    }
    if let Some(ref video) = msg.video_message {
        let mut media = media_fields!(video, MediaKind::Video);
        media.caption = video.caption.clone();
        return Some(media);
    }
    if let Some(ref audio) = msg.audio_message {
        return Some(media_fields!(audio, MediaKind::Audio));
    }
    if let Some(ref doc) = msg.document_message {
        let mut media = media_fields!(doc, MediaKind::Document);
        media.caption = doc.caption.clone();
        media.file_name = doc.file_name.clone();
        return Some(media);
    }
    if let Some(ref sticker) = msg.sticker_message {
        return Some(media_fields!(sticker, MediaKind::Sticker));
    }
    None
}

/// Context info from whichever message type carries it.
fn context_info(msg: &Message) -> Option<&ContextInfo> {
    msg.extended_text_message
        .as_ref()
        .and_then(|m| m.context_info.as_deref())
        .or_else(|| msg.image_message.as_ref().and_then(|m| m.context_info.as_deref()))
        .or_else(|| msg.video_message.as_ref().and_then(|m| m.context_info.as_deref()))
        .or_else(|| msg.audio_message.as_ref().and_then(|m| m.context_info.as_deref()))
        .or_else(|| {
            msg.document_message
                .as_ref()
                .and_then(|m| m.context_info.as_deref())
        })
        .or_else(|| {
            msg.sticker_message
                .as_ref()
                .and_then(|m| m.context_info.as_deref())
        })
}

fn message_context(ctx: &ContextInfo) -> MessageContext {
    let quoted_media = ctx.quoted_message.as_deref().and_then(|quoted| {
        let quoted = unwrap_envelopes(quoted);
        view_once_inner(quoted)
            .map(unwrap_envelopes)
            .and_then(media_ref)
            .or_else(|| media_ref(quoted))
    });

    MessageContext {
        quoted_id: ctx.stanza_id.clone(),
        participant: ctx.participant.clone(),
        mentioned: ctx.mentioned_jid.clone(),
        quoted_media,
    }
}
