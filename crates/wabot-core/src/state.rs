//! Runtime state shared between the gateway and the dashboard.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

/// Number of message previews kept for the dashboard.
pub const RECENT_CAPACITY: usize = 15;

/// Bounded FIFO of message previews. Oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct RecentMessages {
    entries: VecDeque<String>,
    capacity: usize,
}

impl RecentMessages {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, preview: String) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(preview);
    }

    /// Previews, oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RecentMessages {
    fn default() -> Self {
        Self::new(RECENT_CAPACITY)
    }
}

/// Connected flag, recent previews, and the pending pairing QR.
#[derive(Debug)]
pub struct BotState {
    connected: AtomicBool,
    recent: Mutex<RecentMessages>,
    /// Last QR payload, cleared once the session connects.
    last_qr: RwLock<Option<String>>,
    started: Instant,
}

impl BotState {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            recent: Mutex::new(RecentMessages::default()),
            last_qr: RwLock::new(None),
            started: Instant::now(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub async fn record(&self, preview: String) {
        self.recent.lock().await.push(preview);
    }

    pub async fn recent(&self) -> Vec<String> {
        self.recent.lock().await.snapshot()
    }

    pub async fn set_qr(&self, code: Option<String>) {
        *self.last_qr.write().await = code;
    }

    pub async fn qr(&self) -> Option<String> {
        self.last_qr.read().await.clone()
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for BotState {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a duration as `1h 2m 3s`.
pub fn format_uptime(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{hours}h {minutes}m {seconds}s")
}
