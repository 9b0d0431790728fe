use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// JID of the status ("stories") broadcast channel.
pub const STATUS_BROADCAST_JID: &str = "status@broadcast";

/// Maximum preview length (in chars) kept for the dashboard.
const PREVIEW_MAX_CHARS: usize = 100;

/// Kinds of downloadable media the bot handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
    Sticker,
}

impl MediaKind {
    /// Placeholder shown in previews for media without a caption.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Image => "[Image]",
            Self::Video => "[Video]",
            Self::Audio => "[Audio]",
            Self::Document => "[Document]",
            Self::Sticker => "[Sticker]",
        }
    }

    /// Mimetype used when the message did not carry one.
    pub fn default_mimetype(&self) -> &'static str {
        match self {
            Self::Image => "image/jpeg",
            Self::Video => "video/mp4",
            Self::Audio => "audio/ogg; codecs=opus",
            Self::Document => "application/octet-stream",
            Self::Sticker => "image/webp",
        }
    }
}

/// Everything needed to re-download an encrypted media blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub mimetype: Option<String>,
    pub caption: Option<String>,
    pub url: Option<String>,
    pub direct_path: Option<String>,
    pub media_key: Option<Vec<u8>>,
    pub file_sha256: Option<Vec<u8>>,
    pub file_enc_sha256: Option<Vec<u8>>,
    pub file_length: Option<u64>,
    /// Original file name (documents only).
    pub file_name: Option<String>,
}

impl MediaRef {
    pub fn new(kind: MediaKind) -> Self {
        Self {
            kind,
            mimetype: None,
            caption: None,
            url: None,
            direct_path: None,
            media_key: None,
            file_sha256: None,
            file_enc_sha256: None,
            file_length: None,
            file_name: None,
        }
    }

    pub fn mimetype(&self) -> &str {
        self.mimetype
            .as_deref()
            .unwrap_or_else(|| self.kind.default_mimetype())
    }

    /// File extension derived from the mimetype; `jpg` when unknown or unsafe.
    ///
    /// `image/jpeg` → `jpg`, `video/mp4` → `mp4`, `audio/ogg; codecs=opus` → `ogg`.
    pub fn extension(&self) -> String {
        let subtype = self
            .mimetype()
            .split('/')
            .nth(1)
            .and_then(|s| s.split(';').next())
            .map(str::trim)
            .unwrap_or("")
            .to_ascii_lowercase();
        match subtype.as_str() {
            "" => "jpg".to_string(),
            "jpeg" => "jpg".to_string(),
            "mpeg" if self.kind == MediaKind::Audio => "mp3".to_string(),
            "octet-stream" => "bin".to_string(),
            other if is_safe_extension(other) => other.to_string(),
            _ => "jpg".to_string(),
        }
    }
}

/// Longest mimetype subtype used verbatim as a file extension.
const MAX_EXTENSION_LEN: usize = 5;

fn is_safe_extension(subtype: &str) -> bool {
    !subtype.is_empty()
        && subtype.len() <= MAX_EXTENSION_LEN
        && subtype.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Reply context attached to a message (quote and mentions).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContext {
    /// ID of the quoted message.
    pub quoted_id: Option<String>,
    /// Author of the quoted message.
    pub participant: Option<String>,
    pub mentioned: Vec<String>,
    /// Media carried by the quoted message, if any.
    pub quoted_media: Option<MediaRef>,
}

/// An inbound WhatsApp message, decoupled from the protocol library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    /// Chat JID (`user@s.whatsapp.net`, `group@g.us`, `status@broadcast`).
    pub chat: String,
    /// Author JID.
    pub sender: String,
    pub push_name: Option<String>,
    pub is_from_me: bool,
    pub is_group: bool,
    /// Plain text body (conversation or extended text), empty when none.
    pub text: String,
    /// Regular media payload.
    pub media: Option<MediaRef>,
    /// Media wrapped in a view-once envelope.
    pub view_once: Option<MediaRef>,
    pub context: Option<MessageContext>,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn is_status(&self) -> bool {
        self.chat == STATUS_BROADCAST_JID
    }

    /// Phone-number part of the sender JID (`94771234567@s.whatsapp.net` → `94771234567`).
    pub fn sender_phone(&self) -> &str {
        jid_user(&self.sender)
    }

    /// Build a quote reference pointing at this message.
    pub fn quote(&self) -> QuotedRef {
        QuotedRef {
            id: self.id.clone(),
            participant: self.sender.clone(),
            text: self.text.clone(),
        }
    }

    /// Short human-readable preview for the dashboard.
    pub fn preview(&self) -> String {
        let who = self
            .push_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| self.sender_phone());

        let body = if !self.text.is_empty() {
            self.text.clone()
        } else if let Some(media) = self.view_once.as_ref().or(self.media.as_ref()) {
            match media.caption.as_deref().filter(|c| !c.is_empty()) {
                Some(caption) => format!("{} {caption}", media.kind.label()),
                None => media.kind.label().to_string(),
            }
        } else {
            "[Message]".to_string()
        };

        let body = truncate_chars(&body, PREVIEW_MAX_CHARS);
        if self.is_status() {
            format!("[Status] {who}: {body}")
        } else {
            format!("{who}: {body}")
        }
    }
}

/// A message that was deleted for everyone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revocation {
    pub chat: String,
    pub sender: String,
    /// ID of the deleted message.
    pub message_id: String,
}

/// Reference used to quote a message in a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotedRef {
    pub id: String,
    pub participant: String,
    /// Text of the quoted message (shown in the reply bubble).
    pub text: String,
}

/// Media to upload and send.
#[derive(Debug, Clone)]
pub struct OutgoingMedia {
    pub kind: MediaKind,
    pub data: Vec<u8>,
    pub mimetype: String,
    pub caption: Option<String>,
    pub file_name: Option<String>,
    pub quoted: Option<QuotedRef>,
}

impl OutgoingMedia {
    /// Re-send a downloaded payload with the same kind and mimetype.
    pub fn from_download(source: &MediaRef, data: Vec<u8>) -> Self {
        Self {
            kind: source.kind,
            data,
            mimetype: source.mimetype().to_string(),
            caption: None,
            file_name: source.file_name.clone(),
            quoted: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn quoting(mut self, quoted: QuotedRef) -> Self {
        self.quoted = Some(quoted);
        self
    }
}

/// Connection and message events produced by the WhatsApp adapter.
#[derive(Debug, Clone)]
pub enum BotEvent {
    /// A pairing QR payload is available (rotates periodically).
    Qr(String),
    Paired,
    Connected,
    Disconnected,
    /// The session was invalidated from the phone; the client will not reconnect.
    LoggedOut,
    Message(Box<InboundMessage>),
    Revoked(Revocation),
}

/// User part of a JID, without server and device suffixes.
pub fn jid_user(jid: &str) -> &str {
    let user = jid.split('@').next().unwrap_or(jid);
    user.split(':').next().unwrap_or(user)
}

/// Truncate to at most `max` chars, appending `…` when cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
