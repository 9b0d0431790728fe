//! Gateway: the event loop between the WhatsApp session and the bot's
//! automatic behaviors and commands.

mod media;

#[cfg(test)]
mod tests;

use crate::commands::{self, Command, CommandContext};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use wabot_core::config::{BotConfig, Config, FeaturesConfig, WhatsAppConfig};
use wabot_core::message::{BotEvent, InboundMessage};
use wabot_core::state::BotState;
use wabot_core::traits::Messenger;

/// Upper bound for outbound HTTP fetches (profile pictures).
pub(crate) const HTTP_TIMEOUT_SECS: u64 = 30;

/// HTTP client for outbound fetches; every request is bounded by `timeout`.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!("failed to build HTTP client ({e}); falling back to defaults");
            reqwest::Client::new()
        })
}

/// Routes session events to the handlers.
pub struct Gateway {
    pub(crate) messenger: Arc<dyn Messenger>,
    pub(crate) state: Arc<BotState>,
    pub(crate) bot: BotConfig,
    pub(crate) whatsapp: WhatsAppConfig,
    pub(crate) features: FeaturesConfig,
    pub(crate) http: reqwest::Client,
}

impl Gateway {
    pub fn new(messenger: Arc<dyn Messenger>, state: Arc<BotState>, config: &Config) -> Self {
        Self {
            messenger,
            state,
            bot: config.bot.clone(),
            whatsapp: config.whatsapp.clone(),
            features: config.features.clone(),
            http: http_client(Duration::from_secs(HTTP_TIMEOUT_SECS)),
        }
    }

    /// Consume events until the stream ends or Ctrl-C is pressed.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<BotEvent>) -> anyhow::Result<()> {
        info!(
            "wabot gateway running | view-once: {} | status saver: {} | anti-delete: {} | prefix: {}",
            self.features.view_once,
            self.features.status_saver,
            self.features.anti_delete,
            self.bot.prefix,
        );

        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => self.clone().dispatch(event).await,
                    None => {
                        warn!("WhatsApp event stream closed");
                        break;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.state.set_connected(false);
        Ok(())
    }

    /// Connection events are applied inline so their order is preserved;
    /// message work runs on its own task.
    pub(crate) async fn dispatch(self: Arc<Self>, event: BotEvent) {
        match event {
            BotEvent::Qr(code) => self.on_qr(code).await,
            BotEvent::Paired => info!("WhatsApp device linked"),
            BotEvent::Connected => {
                self.state.set_connected(true);
                self.state.set_qr(None).await;
                info!("✅ Bot online! All features active.");
            }
            BotEvent::Disconnected => {
                self.state.set_connected(false);
            }
            BotEvent::LoggedOut => {
                self.state.set_connected(false);
                error!("WhatsApp logged out; not reconnecting");
            }
            BotEvent::Revoked(revocation) => self.on_revoked(&revocation).await,
            BotEvent::Message(msg) => {
                tokio::spawn(async move {
                    self.handle_message(*msg).await;
                });
            }
        }
    }

    async fn on_qr(&self, code: String) {
        match wabot_whatsapp::generate_qr_terminal(&code) {
            Ok(rendered) => {
                println!("\nScan this QR code with WhatsApp (Linked devices → Link a device):\n\n{rendered}");
            }
            Err(e) => warn!("failed to render QR code: {e}"),
        }
        self.state.set_qr(Some(code)).await;
    }

    /// Run every behavior that applies to one inbound message.
    pub(crate) async fn handle_message(&self, msg: InboundMessage) {
        if msg.is_from_me && self.whatsapp.ignore_own_messages {
            debug!("ignoring own message {}", msg.id);
            return;
        }

        self.state.record(msg.preview()).await;

        // Statuses are archived below; re-sending into status@broadcast would post publicly.
        if self.features.view_once && !msg.is_status() {
            if let Some(ref media) = msg.view_once {
                self.save_view_once(&msg, media).await;
            }
        }

        if msg.is_status() {
            if self.features.status_saver {
                self.archive_status(&msg).await;
            }
            return;
        }

        let Some(cmd) = Command::parse(&msg.text, &self.bot.prefix) else {
            return;
        };

        if !self.whatsapp.is_allowed(msg.sender_phone()) {
            warn!("ignoring command from unauthorized {}", msg.sender_phone());
            return;
        }

        info!("command {} from {}", cmd.name(), msg.sender_phone());
        let ctx = CommandContext {
            messenger: self.messenger.as_ref(),
            state: &self.state,
            http: &self.http,
            bot_name: &self.bot.name,
            prefix: &self.bot.prefix,
            msg: &msg,
        };
        commands::handle(cmd, &ctx).await;
    }
}
