//! Automatic media behaviors: view-once saver, status archiver, anti-delete log.

use super::Gateway;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use wabot_core::error::BotError;
use wabot_core::message::{jid_user, InboundMessage, MediaRef, OutgoingMedia, Revocation};

pub(crate) const VIEW_ONCE_CAPTION: &str = "✅ Anti-View Once: saved!";
pub(crate) const VIEW_ONCE_FAILED: &str = "❌ Anti-View Once: couldn't download that media.";

impl Gateway {
    /// Re-send view-once media as a normal message.
    pub(crate) async fn save_view_once(&self, msg: &InboundMessage, media: &MediaRef) {
        let target = self.features.forward_target().unwrap_or(&msg.chat);
        info!("Downloading view-once {:?} from {}", media.kind, msg.sender_phone());

        let bytes = match self.messenger.download(media).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("view-once download failed: {e}");
                if let Err(e) = self.messenger.send_text(target, VIEW_ONCE_FAILED, None).await {
                    warn!("failed to report view-once failure: {e}");
                }
                return;
            }
        };

        let mut copy = OutgoingMedia::from_download(media, bytes).with_caption(VIEW_ONCE_CAPTION);
        // A quote only renders inside the chat it came from.
        if target == msg.chat {
            copy = copy.quoting(msg.quote());
        }

        match self.messenger.send_media(target, copy).await {
            Ok(_) => info!("view-once media saved to {target}"),
            Err(e) => warn!("failed to send saved view-once media: {e}"),
        }
    }

    /// Download status media into `{data_dir}/downloads/status/`.
    pub(crate) async fn archive_status(&self, msg: &InboundMessage) -> Option<PathBuf> {
        let Some(media) = msg.media.as_ref().or(msg.view_once.as_ref()) else {
            debug!("text status from {}, nothing to archive", msg.sender_phone());
            return None;
        };

        let bytes = match self.messenger.download(media).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("status download from {} failed: {e}", msg.sender_phone());
                return None;
            }
        };

        let dir = self.bot.status_dir();
        let stamp = msg.received_at.timestamp_millis();
        match write_status_file(&dir, stamp, &media.extension(), &bytes).await {
            Ok(path) => {
                info!("📸 Status saved: {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("failed to write status media: {e}");
                None
            }
        }
    }

    /// Log a delete-for-everyone and surface it on the dashboard.
    pub(crate) async fn on_revoked(&self, revocation: &Revocation) {
        if !self.features.anti_delete {
            return;
        }
        info!(
            "🗑️ message deleted by {} (id {})",
            revocation.chat, revocation.message_id
        );
        self.state
            .record(format!(
                "[Deleted] {}: message {}",
                jid_user(&revocation.sender),
                revocation.message_id
            ))
            .await;
    }
}

/// Write `<stamp>.<ext>` into `dir`, adding `-N` if that name is taken.
pub(crate) async fn write_status_file(
    dir: &Path,
    stamp: i64,
    ext: &str,
    bytes: &[u8],
) -> Result<PathBuf, BotError> {
    tokio::fs::create_dir_all(dir).await?;

    let mut path = dir.join(format!("{stamp}.{ext}"));
    let mut n = 1;
    while tokio::fs::try_exists(&path).await? {
        path = dir.join(format!("{stamp}-{n}.{ext}"));
        n += 1;
    }

    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}
