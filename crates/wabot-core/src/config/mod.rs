mod defaults;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::BotError;
use defaults::*;

/// Top-level wabot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// General bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Command prefix (`.menu`, `.ping`, ...).
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            prefix: default_prefix(),
        }
    }
}

impl BotConfig {
    /// `data_dir` with `~` expanded.
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(shellexpand(&self.data_dir))
    }

    /// Directory holding the WhatsApp session database.
    pub fn session_dir(&self) -> PathBuf {
        self.data_path().join("whatsapp_session")
    }

    /// Directory where archived status media is written.
    pub fn status_dir(&self) -> PathBuf {
        self.data_path().join("downloads").join("status")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_path().join("logs")
    }
}

/// WhatsApp connection config.
///
/// Session data is stored at `{data_dir}/whatsapp_session/`.
/// Pairing is done by scanning a QR code (like WhatsApp Web).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    /// Phone numbers allowed to run commands (e.g. `["94771234567"]`). Empty = allow all.
    #[serde(default)]
    pub allowed_users: Vec<String>,
    /// Device name shown under "Linked devices" on the phone.
    #[serde(default = "default_device_name")]
    pub device_name: String,
    /// Pause before rebuilding the client after the connection drops.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
    /// Skip messages sent from this account.
    #[serde(default = "default_true")]
    pub ignore_own_messages: bool,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            allowed_users: Vec::new(),
            device_name: default_device_name(),
            reconnect_delay_secs: default_reconnect_delay(),
            ignore_own_messages: true,
        }
    }
}

impl WhatsAppConfig {
    /// Whether `phone` may run commands.
    pub fn is_allowed(&self, phone: &str) -> bool {
        self.allowed_users.is_empty() || self.allowed_users.iter().any(|u| u == phone)
    }
}

/// Toggles for the automatic behaviors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_true")]
    pub view_once: bool,
    #[serde(default = "default_true")]
    pub status_saver: bool,
    #[serde(default = "default_true")]
    pub anti_delete: bool,
    /// JID that receives saved view-once media. Empty = reply in the originating chat.
    #[serde(default)]
    pub forward_to: String,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            view_once: true,
            status_saver: true,
            anti_delete: true,
            forward_to: String::new(),
        }
    }
}

impl FeaturesConfig {
    pub fn forward_target(&self) -> Option<&str> {
        let target = self.forward_to.trim();
        (!target.is_empty()).then_some(target)
    }
}

/// HTTP status dashboard configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_dashboard_host")]
    pub host: String,
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
    /// Bearer token for the dashboard. Empty = no auth (for local-only use).
    #[serde(default)]
    pub api_key: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_dashboard_host(),
            port: default_dashboard_port(),
            api_key: String::new(),
        }
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, BotError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| BotError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| BotError::Config(format!("failed to parse config: {}", e)))?;

    if config.bot.prefix.is_empty() {
        return Err(BotError::Config("bot.prefix must not be empty".into()));
    }

    Ok(config)
}
