use super::*;

#[test]
fn test_defaults_when_sections_missing() {
    let cfg: Config = toml::from_str("").unwrap();
    assert_eq!(cfg.bot.name, "wabot");
    assert_eq!(cfg.bot.prefix, ".");
    assert_eq!(cfg.whatsapp.reconnect_delay_secs, 5);
    assert!(cfg.whatsapp.ignore_own_messages);
    assert!(cfg.features.view_once);
    assert!(cfg.features.status_saver);
    assert!(cfg.dashboard.enabled);
    assert_eq!(cfg.dashboard.port, 3000);
}

#[test]
fn test_partial_sections_keep_field_defaults() {
    let toml_str = r#"
        [bot]
        prefix = "!"

        [dashboard]
        port = 8080
    "#;
    let cfg: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(cfg.bot.prefix, "!");
    assert_eq!(cfg.bot.data_dir, "~/.wabot");
    assert_eq!(cfg.dashboard.port, 8080);
    assert_eq!(cfg.dashboard.host, "127.0.0.1");
}

#[test]
fn test_allowed_users_empty_allows_all() {
    let wa = WhatsAppConfig::default();
    assert!(wa.is_allowed("94771234567"));

    let wa = WhatsAppConfig {
        allowed_users: vec!["94771234567".to_string()],
        ..Default::default()
    };
    assert!(wa.is_allowed("94771234567"));
    assert!(!wa.is_allowed("5511999887766"));
}

#[test]
fn test_forward_target_blank_is_none() {
    let mut features = FeaturesConfig::default();
    assert_eq!(features.forward_target(), None);
    features.forward_to = "   ".to_string();
    assert_eq!(features.forward_target(), None);
    features.forward_to = "94771234567@s.whatsapp.net".to_string();
    assert_eq!(features.forward_target(), Some("94771234567@s.whatsapp.net"));
}

#[test]
fn test_data_subdirectories() {
    let bot = BotConfig {
        data_dir: "/srv/wabot".to_string(),
        ..Default::default()
    };
    assert_eq!(bot.session_dir(), PathBuf::from("/srv/wabot/whatsapp_session"));
    assert_eq!(bot.status_dir(), PathBuf::from("/srv/wabot/downloads/status"));
    assert_eq!(bot.log_dir(), PathBuf::from("/srv/wabot/logs"));
}

#[test]
fn test_shellexpand_leaves_absolute_paths() {
    assert_eq!(shellexpand("/tmp/x"), "/tmp/x");
}

#[test]
fn test_load_missing_file_uses_defaults() {
    let cfg = load("/nonexistent/wabot/config.toml").unwrap();
    assert_eq!(cfg.bot.name, "wabot");
}

#[test]
fn test_load_rejects_empty_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[bot]\nprefix = \"\"\n").unwrap();
    let err = load(path.to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("prefix"));
}

#[test]
fn test_load_reports_parse_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[dashboard]\nport = \"not a number\"\n").unwrap();
    let err = load(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, BotError::Config(_)));
}
