//! WhatsApp session adapter over `whatsapp-rust`.
//!
//! Uses the WhatsApp Web protocol (Noise handshake + Signal encryption).
//! Pairing is done by scanning a QR code, like WhatsApp Web.
//! Session is persisted to `{data_dir}/whatsapp_session/whatsapp.db`.

mod bot;
mod events;
mod messenger;
mod qr;
mod send;


pub use qr::{generate_qr_image, generate_qr_terminal, start_pairing};

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use wabot_core::config::WhatsAppConfig;
use wabot_core::error::BotError;

/// File name of the session database inside the session directory.
pub const SESSION_DB_FILE: &str = "whatsapp.db";

/// How many sent message IDs are remembered for echo suppression.
pub(crate) const SENT_IDS_CAPACITY: usize = 512;

/// Recently sent message IDs, oldest evicted first.
///
/// Echoes only arrive for some chats, so entries cannot rely on being
/// removed by their echo.
#[derive(Debug)]
pub(crate) struct SentIds {
    order: VecDeque<String>,
    ids: HashSet<String>,
    capacity: usize,
}

impl SentIds {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity),
            ids: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    pub(crate) fn insert(&mut self, id: String) {
        if !self.ids.insert(id.clone()) {
            return;
        }
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
    }

    /// Forget `id`; returns whether it was one of ours.
    pub(crate) fn remove(&mut self, id: &str) -> bool {
        if !self.ids.remove(id) {
            return false;
        }
        self.order.retain(|known| known != id);
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}

/// A WhatsApp Web session: owns the client handle and its reconnect supervisor.
///
/// Cloning is cheap; clones share the same client handle and flags.
#[derive(Clone)]
pub struct WhatsAppSession {
    pub(crate) config: WhatsAppConfig,
    pub(crate) session_dir: PathBuf,
    /// Client handle for sending messages, set once the bot is built.
    pub(crate) client: Arc<Mutex<Option<Arc<whatsapp_rust::client::Client>>>>,
    /// Message IDs we sent, so their echoes can be dropped.
    pub(crate) sent_ids: Arc<Mutex<SentIds>>,
    /// Set when the phone unlinks this device; stops the reconnect loop.
    pub(crate) logged_out: Arc<AtomicBool>,
    /// Set by `stop()`.
    pub(crate) shutdown: Arc<AtomicBool>,
}

impl WhatsAppSession {
    /// Create a new session from config. Nothing connects until `start()`.
    pub fn new(config: WhatsAppConfig, session_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            session_dir: session_dir.into(),
            client: Arc::new(Mutex::new(None)),
            sent_ids: Arc::new(Mutex::new(SentIds::new(SENT_IDS_CAPACITY))),
            logged_out: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether the phone unlinked this device during the current run.
    pub fn is_logged_out(&self) -> bool {
        self.logged_out.load(Ordering::SeqCst)
    }

    /// Stop reconnecting and drop the client handle.
    pub async fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        *self.client.lock().await = None;
        tracing::info!("WhatsApp session stopped");
    }

    /// Get the session database path, creating the directory if needed.
    pub(crate) fn session_db_path(&self) -> Result<String, BotError> {
        session_db_path(&self.session_dir)
    }
}

/// `{session_dir}/whatsapp.db`, creating `session_dir` if needed.
pub fn session_db_path(session_dir: &Path) -> Result<String, BotError> {
    std::fs::create_dir_all(session_dir)?;
    Ok(session_dir.join(SESSION_DB_FILE).to_string_lossy().to_string())
}

/// Whether a paired session database already exists.
pub fn session_exists(session_dir: &Path) -> bool {
    session_dir.join(SESSION_DB_FILE).exists()
}
