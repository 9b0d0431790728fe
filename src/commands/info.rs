//! Informational commands: .menu, .ping, .alive.

use super::{reply, CommandContext};
use std::time::Instant;
use tracing::warn;
use wabot_core::state::{format_uptime, BotState};

pub(super) fn menu_text(bot_name: &str, prefix: &str) -> String {
    format!(
        "🤖 *{bot_name} Menu*\n\n\
         {prefix}menu - show this menu\n\
         {prefix}ping - check response time\n\
         {prefix}alive - check if the bot is running\n\
         {prefix}getdp - get a profile picture (mention or reply to someone)\n\
         {prefix}send / {prefix}get - reply to a status or media to get a copy\n\n\
         View-once media and statuses are saved automatically."
    )
}

pub(super) fn alive_text(bot_name: &str, state: &BotState) -> String {
    format!(
        "✅ *{bot_name} is alive!*\n\
         ⏱️ Uptime: {}\n\
         📶 Connected: {}",
        format_uptime(state.uptime()),
        if state.is_connected() { "yes" } else { "no" },
    )
}

/// Sends a probe message and reports how long the send took.
pub(super) async fn handle_ping(ctx: &CommandContext<'_>) {
    let started = Instant::now();
    if let Err(e) = ctx
        .messenger
        .send_text(&ctx.msg.chat, "🏓 Pinging...", None)
        .await
    {
        warn!("ping probe failed: {e}");
        return;
    }
    let ms = started.elapsed().as_millis();
    reply(ctx, &format!("🏓 Pong! {ms} ms")).await;
}
