//! Media commands: .getdp and .send/.get.

use super::{reply, CommandContext};
use tracing::{info, warn};
use wabot_core::error::BotError;
use wabot_core::message::{InboundMessage, MediaKind, OutgoingMedia};

pub(super) const DP_CAPTION: &str = "✅ Here is the profile picture!";
pub(super) const DP_FAILED: &str =
    "❌ Unable to fetch the profile picture (no picture or privacy settings).";
pub(super) const SEND_CAPTION: &str = "✅ Here you go!";
pub(super) const SEND_FAILED: &str = "❌ Couldn't download that media.";

/// Whose picture `.getdp` fetches: first mention, then the quoted
/// message's author, then the chat itself.
pub(super) fn dp_target(msg: &InboundMessage) -> &str {
    let ctx = msg.context.as_ref();
    ctx.and_then(|c| c.mentioned.first())
        .or_else(|| ctx.and_then(|c| c.participant.as_ref()))
        .map(String::as_str)
        .unwrap_or(&msg.chat)
}

pub(super) async fn handle_getdp(ctx: &CommandContext<'_>) {
    let target = dp_target(ctx.msg);
    info!("fetching profile picture of {target}");

    let bytes = match fetch_profile_picture(ctx, target).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("profile picture lookup for {target} failed: {e}");
            reply(ctx, DP_FAILED).await;
            return;
        }
    };

    let media = OutgoingMedia {
        kind: MediaKind::Image,
        data: bytes,
        mimetype: MediaKind::Image.default_mimetype().to_string(),
        caption: Some(DP_CAPTION.to_string()),
        file_name: None,
        quoted: Some(ctx.msg.quote()),
    };
    if let Err(e) = ctx.messenger.send_media(&ctx.msg.chat, media).await {
        warn!("failed to send profile picture: {e}");
        reply(ctx, DP_FAILED).await;
    }
}

async fn fetch_profile_picture(ctx: &CommandContext<'_>, target: &str) -> Result<Vec<u8>, BotError> {
    let url = ctx
        .messenger
        .profile_picture_url(target)
        .await?
        .ok_or_else(|| BotError::Client(format!("{target} has no visible profile picture")))?;
    fetch_bytes(ctx.http, &url).await
}

/// GET a URL and return the body.
pub(super) async fn fetch_bytes(http: &reqwest::Client, url: &str) -> Result<Vec<u8>, BotError> {
    let resp = http
        .get(url)
        .send()
        .await
        .map_err(|e| BotError::Http(format!("request failed: {e}")))?
        .error_for_status()
        .map_err(|e| BotError::Http(format!("bad status: {e}")))?;
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| BotError::Http(format!("body read failed: {e}")))?;
    Ok(bytes.to_vec())
}

/// Re-send the media the command message replies to.
pub(super) async fn handle_send(ctx: &CommandContext<'_>) {
    let Some(quoted) = ctx
        .msg
        .context
        .as_ref()
        .and_then(|c| c.quoted_media.as_ref())
    else {
        reply(
            ctx,
            &format!(
                "Reply to a status or media message with {}send to get a copy.",
                ctx.prefix
            ),
        )
        .await;
        return;
    };

    let bytes = match ctx.messenger.download(quoted).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("quoted media download failed: {e}");
            reply(ctx, SEND_FAILED).await;
            return;
        }
    };

    let caption = quoted
        .caption
        .clone()
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| SEND_CAPTION.to_string());
    let copy = OutgoingMedia::from_download(quoted, bytes)
        .with_caption(caption)
        .quoting(ctx.msg.quote());

    if let Err(e) = ctx.messenger.send_media(&ctx.msg.chat, copy).await {
        warn!("failed to re-send quoted media: {e}");
        reply(ctx, SEND_FAILED).await;
    }
}
