//! QR code rendering and the standalone pairing flow.

use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;
use wabot_core::error::BotError;
use wacore::types::events::Event;
use whatsapp_rust::bot::Bot;
use whatsapp_rust_sqlite_storage::SqliteStore;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;

/// Light modules around the code; scanners need at least a small margin.
const QUIET_ZONE: usize = 2;
/// Pixels per module in the PNG rendering.
const PNG_MODULE_PX: u32 = 10;

fn encode(qr_data: &str) -> Result<qrcode::QrCode, BotError> {
    qrcode::QrCode::with_error_correction_level(qr_data.as_bytes(), qrcode::EcLevel::L)
        .map_err(|e| BotError::Media(format!("QR generation failed: {e}")))
}

/// Render a QR code for the terminal using Unicode half blocks.
///
/// Each output line packs two module rows (`▀`, `▄`, `█`, space), so the
/// code keeps a roughly square aspect ratio in a normal terminal font.
pub fn generate_qr_terminal(qr_data: &str) -> Result<String, BotError> {
    let code = encode(qr_data)?;
    let width = code.width();
    let colors = code.into_colors();
    let padded = width + QUIET_ZONE * 2;

    let dark = |row: usize, col: usize| -> bool {
        let (Some(r), Some(c)) = (row.checked_sub(QUIET_ZONE), col.checked_sub(QUIET_ZONE)) else {
            return false;
        };
        r < width && c < width && colors[r * width + c] == qrcode::Color::Dark
    };

    let mut out = String::with_capacity((padded + 1) * padded.div_ceil(2));
    for row in (0..padded).step_by(2) {
        for col in 0..padded {
            out.push(match (dark(row, col), dark(row + 1, col)) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                (false, false) => ' ',
            });
        }
        out.push('\n');
    }

    Ok(out)
}

/// Render a QR code as PNG bytes (served by the dashboard).
pub fn generate_qr_image(qr_data: &str) -> Result<Vec<u8>, BotError> {
    use image::{ImageBuffer, Luma};

    let code = encode(qr_data)?;
    let modules = code.width() as u32;
    let quiet = QUIET_ZONE as u32;
    let side = (modules + quiet * 2) * PNG_MODULE_PX;

    let img = ImageBuffer::from_fn(side, side, |x, y| {
        let (mx, my) = (x / PNG_MODULE_PX, y / PNG_MODULE_PX);
        let inside = mx >= quiet && my >= quiet && mx < modules + quiet && my < modules + quiet;
        if inside && code[((mx - quiet) as usize, (my - quiet) as usize)] == qrcode::Color::Dark {
            Luma([0u8])
        } else {
            Luma([255u8])
        }
    });

    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .map_err(|e| BotError::Media(format!("PNG encoding failed: {e}")))?;

    Ok(buf.into_inner())
}

/// Start a standalone pairing flow.
///
/// Returns a receiver yielding QR payloads as WhatsApp rotates them, and a
/// receiver that fires once the device is linked. With `reset`, the existing
/// session directory is deleted first so fresh keys (and QR codes) are used.
pub async fn start_pairing(
    session_dir: &Path,
    device_name: &str,
    reset: bool,
) -> Result<(mpsc::Receiver<String>, mpsc::Receiver<bool>), BotError> {
    if reset && session_dir.exists() {
        info!("deleting stale WhatsApp session at {}", session_dir.display());
        std::fs::remove_dir_all(session_dir)?;
    }

    let (qr_tx, qr_rx) = mpsc::channel::<String>(4);
    let (done_tx, done_rx) = mpsc::channel::<bool>(1);

    let db_path = crate::session_db_path(session_dir)?;
    let backend = Arc::new(
        SqliteStore::new(&db_path)
            .await
            .map_err(|e| BotError::Client(format!("whatsapp store init failed: {e}")))?,
    );

    let mut bot = Bot::builder()
        .with_backend(backend)
        .with_transport_factory(TokioWebSocketTransportFactory::new())
        .with_http_client(UreqHttpClient::new())
        .with_device_props(
            Some(device_name.to_string()),
            None,
            Some(waproto::whatsapp::device_props::PlatformType::Desktop),
        )
        .on_event(move |event, _client| {
            let qr_tx = qr_tx.clone();
            let done_tx = done_tx.clone();
            async move {
                match event {
                    Event::PairingQrCode { code, .. } => {
                        let _ = qr_tx.send(code).await;
                    }
                    Event::PairSuccess(_) | Event::Connected(_) => {
                        let _ = done_tx.send(true).await;
                    }
                    _ => {}
                }
            }
        })
        .build()
        .await
        .map_err(|e| BotError::Client(format!("whatsapp pairing build failed: {e}")))?;

    let _handle = bot
        .run()
        .await
        .map_err(|e| BotError::Client(format!("whatsapp pairing run failed: {e}")))?;

    Ok((qr_rx, done_rx))
}
