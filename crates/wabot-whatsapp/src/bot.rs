//! Client lifecycle and the reconnect supervisor.

use super::events::translate_message;
use super::WhatsAppSession;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use wabot_core::error::BotError;
use wabot_core::message::BotEvent;
use wacore::types::events::Event;
use whatsapp_rust::bot::Bot;
use whatsapp_rust_sqlite_storage::SqliteStore;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;

/// Capacity of the event channel handed to the gateway.
const EVENT_BUFFER: usize = 64;

/// Why the supervisor stopped rebuilding the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopReason {
    Shutdown,
    LoggedOut,
    ReceiverClosed,
}

/// What the supervisor does after the client task ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SupervisorStep {
    Reconnect,
    Stop(StopReason),
}

/// Reconnect unless stopped, logged out, or nobody is listening.
/// An explicit shutdown wins over a logout.
pub(crate) fn next_step(shutdown: bool, logged_out: bool, receiver_closed: bool) -> SupervisorStep {
    if shutdown {
        SupervisorStep::Stop(StopReason::Shutdown)
    } else if logged_out {
        SupervisorStep::Stop(StopReason::LoggedOut)
    } else if receiver_closed {
        SupervisorStep::Stop(StopReason::ReceiverClosed)
    } else {
        SupervisorStep::Reconnect
    }
}

impl WhatsAppSession {
    /// Connect and start forwarding events.
    ///
    /// The first build happens inline so store or builder errors surface to
    /// the caller. After that a background supervisor rebuilds the client
    /// whenever it stops, unless the session was logged out or `stop()` ran.
    pub async fn start(&self) -> Result<mpsc::Receiver<BotEvent>, BotError> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        self.shutdown.store(false, Ordering::SeqCst);
        self.logged_out.store(false, Ordering::SeqCst);

        let handle = self.build_and_run_bot(tx.clone()).await?;

        let session = self.clone();
        tokio::spawn(async move {
            session.supervise(tx, handle).await;
        });

        info!("WhatsApp session started");
        Ok(rx)
    }

    /// Reconnect loop: wait for the client task, then rebuild it.
    async fn supervise(self, tx: mpsc::Sender<BotEvent>, first: JoinHandle<()>) {
        let delay = Duration::from_secs(self.config.reconnect_delay_secs.max(1));
        let mut handle = Some(first);

        loop {
            if let Some(running) = handle.take() {
                if let Err(e) = running.await {
                    warn!("whatsapp client task ended abnormally: {e}");
                }
            }

            *self.client.lock().await = None;

            match next_step(
                self.shutdown.load(Ordering::SeqCst),
                self.logged_out.load(Ordering::SeqCst),
                tx.is_closed(),
            ) {
                SupervisorStep::Reconnect => {}
                SupervisorStep::Stop(StopReason::Shutdown) => {
                    debug!("whatsapp supervisor exiting (shutdown)");
                    break;
                }
                SupervisorStep::Stop(StopReason::LoggedOut) => {
                    error!("WhatsApp session logged out; run `wabot pair --reset` to link again");
                    break;
                }
                SupervisorStep::Stop(StopReason::ReceiverClosed) => {
                    debug!("whatsapp supervisor exiting (receiver dropped)");
                    break;
                }
            }

            warn!("WhatsApp connection closed, reconnecting in {}s", delay.as_secs());
            tokio::time::sleep(delay).await;

            match self.build_and_run_bot(tx.clone()).await {
                Ok(next) => handle = Some(next),
                Err(e) => error!("whatsapp reconnect failed: {e}"),
            }
        }
    }

    /// Build a WhatsApp bot with the event handler and run it in the background.
    pub(crate) async fn build_and_run_bot(
        &self,
        tx: mpsc::Sender<BotEvent>,
    ) -> Result<JoinHandle<()>, BotError> {
        let db_path = self.session_db_path()?;
        info!("WhatsApp bot building (session: {db_path})...");

        let backend = Arc::new(
            SqliteStore::new(&db_path)
                .await
                .map_err(|e| BotError::Client(format!("whatsapp store init failed: {e}")))?,
        );

        let client_handle = self.client.clone();
        let sent_ids = self.sent_ids.clone();
        let logged_out = self.logged_out.clone();

        let mut bot = Bot::builder()
            .with_backend(backend)
            .with_transport_factory(TokioWebSocketTransportFactory::new())
            .with_http_client(UreqHttpClient::new())
            .with_device_props(
                Some(self.config.device_name.clone()),
                None,
                Some(waproto::whatsapp::device_props::PlatformType::Desktop),
            )
            .on_event(move |event, client| {
                let tx = tx.clone();
                let client_store = client_handle.clone();
                let sent_ids = sent_ids.clone();
                let logged_out = logged_out.clone();
                async move {
                    let forwarded = match event {
                        Event::PairingQrCode { code, .. } => {
                            info!("WhatsApp QR code generated (scan to pair)");
                            Some(BotEvent::Qr(code))
                        }
                        Event::PairSuccess(_) => {
                            info!("WhatsApp pairing successful");
                            Some(BotEvent::Paired)
                        }
                        Event::Connected(_) => {
                            *client_store.lock().await = Some(client);
                            Some(BotEvent::Connected)
                        }
                        Event::Disconnected(_) => {
                            warn!("WhatsApp disconnected");
                            Some(BotEvent::Disconnected)
                        }
                        Event::LoggedOut(_) => {
                            warn!("WhatsApp logged out — session invalidated");
                            logged_out.store(true, Ordering::SeqCst);
                            *client_store.lock().await = None;
                            Some(BotEvent::LoggedOut)
                        }
                        Event::Message(msg, info) => {
                            if sent_ids.lock().await.remove(&info.id) {
                                debug!("skipping own echo: {}", info.id);
                                None
                            } else {
                                translate_message(&msg, &info)
                            }
                        }
                        _ => None,
                    };

                    if let Some(event) = forwarded {
                        if tx.send(event).await.is_err() {
                            debug!("whatsapp event receiver dropped");
                        }
                    }
                }
            })
            .build()
            .await
            .map_err(|e| BotError::Client(format!("whatsapp bot build failed: {e}")))?;

        // Store client reference immediately so sends work once connected.
        *self.client.lock().await = Some(bot.client());

        let handle = bot
            .run()
            .await
            .map_err(|e| BotError::Client(format!("whatsapp bot run failed: {e}")))?;

        info!("WhatsApp bot running");
        Ok(handle)
    }
}
