use super::media::{write_status_file, VIEW_ONCE_CAPTION, VIEW_ONCE_FAILED};
use super::*;
use crate::test_support::{image_ref, text_msg, MockMessenger};
use wabot_core::message::{Revocation, STATUS_BROADCAST_JID};

fn gateway(mock: Arc<MockMessenger>, data_dir: &std::path::Path) -> Gateway {
    let mut config = Config::default();
    config.bot.data_dir = data_dir.to_string_lossy().to_string();
    Gateway::new(mock, Arc::new(BotState::new()), &config)
}

#[tokio::test]
async fn test_message_recorded_for_dashboard() {
    let tmp = tempfile::tempdir().unwrap();
    let gw = gateway(Arc::new(MockMessenger::default()), tmp.path());

    gw.handle_message(text_msg("hello there")).await;

    assert_eq!(gw.state.recent().await, vec!["Kasun: hello there"]);
}

#[tokio::test]
async fn test_own_messages_ignored() {
    let tmp = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockMessenger::default());
    let gw = gateway(mock.clone(), tmp.path());

    let mut msg = text_msg(".ping");
    msg.is_from_me = true;
    gw.handle_message(msg).await;

    assert!(gw.state.recent().await.is_empty());
    assert!(mock.texts().is_empty());
}

#[tokio::test]
async fn test_own_commands_run_when_not_ignored() {
    let tmp = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockMessenger::default());
    let mut gw = gateway(mock.clone(), tmp.path());
    gw.whatsapp.ignore_own_messages = false;

    let mut msg = text_msg(".alive");
    msg.is_from_me = true;
    gw.handle_message(msg).await;

    assert_eq!(mock.texts().len(), 1);
}

#[tokio::test]
async fn test_view_once_saved_back_to_chat() {
    let tmp = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockMessenger::with_download(b"secret"));
    let gw = gateway(mock.clone(), tmp.path());

    let mut msg = text_msg("");
    msg.view_once = Some(image_ref(None));
    gw.handle_message(msg.clone()).await;

    let sent = mock.sent_media();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].chat, msg.chat);
    assert_eq!(sent[0].media.data, b"secret");
    assert_eq!(sent[0].media.caption.as_deref(), Some(VIEW_ONCE_CAPTION));
    assert_eq!(sent[0].media.quoted.as_ref().map(|q| q.id.as_str()), Some("MSG1"));
}

#[tokio::test]
async fn test_view_once_forwarded_without_quote() {
    let tmp = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockMessenger::with_download(b"secret"));
    let mut gw = gateway(mock.clone(), tmp.path());
    gw.features.forward_to = "94770000009@s.whatsapp.net".to_string();

    let mut msg = text_msg("");
    msg.view_once = Some(image_ref(None));
    gw.handle_message(msg).await;

    let sent = mock.sent_media();
    assert_eq!(sent[0].chat, "94770000009@s.whatsapp.net");
    assert!(sent[0].media.quoted.is_none());
}

#[tokio::test]
async fn test_view_once_download_failure_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockMessenger::default());
    let gw = gateway(mock.clone(), tmp.path());

    let mut msg = text_msg("");
    msg.view_once = Some(image_ref(None));
    gw.handle_message(msg).await;

    assert!(mock.sent_media().is_empty());
    assert_eq!(mock.texts()[0].text, VIEW_ONCE_FAILED);
}

#[tokio::test]
async fn test_view_once_disabled() {
    let tmp = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockMessenger::with_download(b"secret"));
    let mut gw = gateway(mock.clone(), tmp.path());
    gw.features.view_once = false;

    let mut msg = text_msg("");
    msg.view_once = Some(image_ref(None));
    gw.handle_message(msg).await;

    assert!(mock.sent_media().is_empty());
}

#[tokio::test]
async fn test_status_media_archived() {
    let tmp = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockMessenger::with_download(b"status-jpeg"));
    let gw = gateway(mock.clone(), tmp.path());

    let mut msg = text_msg("");
    msg.chat = STATUS_BROADCAST_JID.to_string();
    msg.media = Some(image_ref(None));

    let path = gw.archive_status(&msg).await.expect("archived");
    assert!(path.starts_with(tmp.path().join("downloads").join("status")));
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));
    assert_eq!(std::fs::read(&path).unwrap(), b"status-jpeg");
    // Nothing is sent back for statuses.
    assert!(mock.sent_media().is_empty() && mock.texts().is_empty());
}

#[tokio::test]
async fn test_status_view_once_archived_not_reposted() {
    let tmp = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockMessenger::with_download(b"status-secret"));
    let gw = gateway(mock.clone(), tmp.path());

    let mut msg = text_msg("");
    msg.chat = STATUS_BROADCAST_JID.to_string();
    msg.view_once = Some(image_ref(None));
    gw.handle_message(msg).await;

    // Nothing may be sent into status@broadcast.
    assert!(mock.sent_media().is_empty());
    assert!(mock.texts().is_empty());
    let archived: Vec<_> = std::fs::read_dir(tmp.path().join("downloads").join("status"))
        .unwrap()
        .collect();
    assert_eq!(archived.len(), 1);
}

#[tokio::test]
async fn test_status_commands_not_executed() {
    let tmp = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockMessenger::default());
    let gw = gateway(mock.clone(), tmp.path());

    let mut msg = text_msg(".ping");
    msg.chat = STATUS_BROADCAST_JID.to_string();
    gw.handle_message(msg).await;

    assert!(mock.texts().is_empty());
    assert_eq!(gw.state.recent().await, vec!["[Status] Kasun: .ping"]);
}

#[tokio::test]
async fn test_text_status_not_archived() {
    let tmp = tempfile::tempdir().unwrap();
    let gw = gateway(Arc::new(MockMessenger::with_download(b"x")), tmp.path());

    let mut msg = text_msg("good morning");
    msg.chat = STATUS_BROADCAST_JID.to_string();
    assert!(gw.archive_status(&msg).await.is_none());
}

#[tokio::test]
async fn test_write_status_file_avoids_collisions() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("status");

    let first = write_status_file(&dir, 1700000000000, "mp4", b"a").await.unwrap();
    let second = write_status_file(&dir, 1700000000000, "mp4", b"b").await.unwrap();

    assert_eq!(first.file_name().unwrap(), "1700000000000.mp4");
    assert_eq!(second.file_name().unwrap(), "1700000000000-1.mp4");
    assert_eq!(std::fs::read(&first).unwrap(), b"a");
}

#[tokio::test]
async fn test_unauthorized_command_ignored() {
    let tmp = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockMessenger::default());
    let mut gw = gateway(mock.clone(), tmp.path());
    gw.whatsapp.allowed_users = vec!["94770000000".to_string()];

    gw.handle_message(text_msg(".menu")).await;
    assert!(mock.texts().is_empty());

    gw.whatsapp.allowed_users = vec!["94771234567".to_string()];
    gw.handle_message(text_msg(".menu")).await;
    assert_eq!(mock.texts().len(), 1);
}

#[tokio::test]
async fn test_connection_events_update_state() {
    let tmp = tempfile::tempdir().unwrap();
    let gw = Arc::new(gateway(Arc::new(MockMessenger::default()), tmp.path()));

    gw.clone().dispatch(BotEvent::Qr("2@abc,def".to_string())).await;
    assert_eq!(gw.state.qr().await.as_deref(), Some("2@abc,def"));
    assert!(!gw.state.is_connected());

    gw.clone().dispatch(BotEvent::Connected).await;
    assert!(gw.state.is_connected());
    assert!(gw.state.qr().await.is_none());

    gw.clone().dispatch(BotEvent::Disconnected).await;
    assert!(!gw.state.is_connected());

    gw.clone().dispatch(BotEvent::Connected).await;
    gw.clone().dispatch(BotEvent::LoggedOut).await;
    assert!(!gw.state.is_connected());
}

#[tokio::test]
async fn test_revocation_recorded_when_enabled() {
    let tmp = tempfile::tempdir().unwrap();
    let mut gw = gateway(Arc::new(MockMessenger::default()), tmp.path());
    let revocation = Revocation {
        chat: "94771234567@s.whatsapp.net".to_string(),
        sender: "94771234567@s.whatsapp.net".to_string(),
        message_id: "DEL1".to_string(),
    };

    gw.on_revoked(&revocation).await;
    assert_eq!(gw.state.recent().await, vec!["[Deleted] 94771234567: message DEL1"]);

    gw.features.anti_delete = false;
    gw.on_revoked(&revocation).await;
    assert_eq!(gw.state.recent().await.len(), 1);
}

#[tokio::test]
async fn test_run_stops_when_stream_closes() {
    let tmp = tempfile::tempdir().unwrap();
    let gw = Arc::new(gateway(Arc::new(MockMessenger::default()), tmp.path()));
    let (tx, rx) = mpsc::channel(4);

    tx.send(BotEvent::Connected).await.unwrap();
    drop(tx);
    gw.clone().run(rx).await.unwrap();

    // The loop exits on a closed stream and marks the bot offline.
    assert!(!gw.state.is_connected());
}
