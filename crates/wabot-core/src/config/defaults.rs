//! Default value functions used by serde for config deserialization.

pub fn default_name() -> String {
    "wabot".to_string()
}

pub fn default_data_dir() -> String {
    "~/.wabot".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_prefix() -> String {
    ".".to_string()
}

pub fn default_true() -> bool {
    true
}

pub fn default_device_name() -> String {
    "wabot".to_string()
}

pub fn default_reconnect_delay() -> u64 {
    5
}

pub fn default_dashboard_host() -> String {
    "127.0.0.1".to_string()
}

pub fn default_dashboard_port() -> u16 {
    3000
}
