//! Chat commands (`.menu`, `.ping`, `.alive`, `.getdp`, `.send`/`.get`).

mod info;
mod media;


use tracing::warn;
use wabot_core::message::InboundMessage;
use wabot_core::state::BotState;
use wabot_core::traits::Messenger;

/// Everything a command handler needs.
pub struct CommandContext<'a> {
    pub messenger: &'a dyn Messenger,
    pub state: &'a BotState,
    pub http: &'a reqwest::Client,
    pub bot_name: &'a str,
    pub prefix: &'a str,
    pub msg: &'a InboundMessage,
}

/// Known bot commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Menu,
    Ping,
    Alive,
    GetDp,
    /// `.send` and `.get`: re-send the quoted media.
    Send,
}

impl Command {
    /// Parse a command from message text. The first word must be `prefix`
    /// followed by a known name; trailing arguments are ignored.
    pub fn parse(text: &str, prefix: &str) -> Option<Self> {
        let first = text.split_whitespace().next()?;
        let name = first.strip_prefix(prefix)?;
        match name.to_lowercase().as_str() {
            "menu" | "help" => Some(Self::Menu),
            "ping" => Some(Self::Ping),
            "alive" => Some(Self::Alive),
            "getdp" => Some(Self::GetDp),
            "send" | "get" => Some(Self::Send),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Menu => "menu",
            Self::Ping => "ping",
            Self::Alive => "alive",
            Self::GetDp => "getdp",
            Self::Send => "send",
        }
    }
}

/// Run a command, replying in the chat it came from.
pub async fn handle(cmd: Command, ctx: &CommandContext<'_>) {
    match cmd {
        Command::Menu => reply(ctx, &info::menu_text(ctx.bot_name, ctx.prefix)).await,
        Command::Ping => info::handle_ping(ctx).await,
        Command::Alive => reply(ctx, &info::alive_text(ctx.bot_name, ctx.state)).await,
        Command::GetDp => media::handle_getdp(ctx).await,
        Command::Send => media::handle_send(ctx).await,
    }
}

/// Reply to the command message, quoting it. Send failures are logged only.
pub(crate) async fn reply(ctx: &CommandContext<'_>, text: &str) {
    let quote = ctx.msg.quote();
    if let Err(e) = ctx
        .messenger
        .send_text(&ctx.msg.chat, text, Some(&quote))
        .await
    {
        warn!("failed to reply in {}: {e}", ctx.msg.chat);
    }
}
