mod api;
mod commands;
mod gateway;
mod logging;

#[cfg(test)]
mod test_support;

use clap::{Parser, Subcommand};
use std::sync::Arc;
use wabot_core::config;
use wabot_core::state::BotState;
use wabot_whatsapp::WhatsAppSession;

#[derive(Parser)]
#[command(
    name = "wabot",
    version,
    about = "WhatsApp automation bot: view-once saver, status archiver, chat commands"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to WhatsApp and run the bot.
    Start,
    /// Show configuration and session state.
    Status,
    /// Link this bot as a WhatsApp device by scanning a QR code.
    Pair {
        /// Delete the existing session first.
        #[arg(long)]
        reset: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;

    match cli.command {
        Commands::Start => {
            let _log_guard = logging::init_service(&cfg.bot.log_dir(), &cfg.bot.log_level)?;
            println!("🤖 {} — starting...", cfg.bot.name);

            let session = WhatsAppSession::new(cfg.whatsapp.clone(), cfg.bot.session_dir());
            let state = Arc::new(BotState::new());

            if cfg.dashboard.enabled {
                tokio::spawn(api::serve(cfg.dashboard.clone(), state.clone()));
            }

            let rx = session.start().await?;
            let gw = Arc::new(gateway::Gateway::new(
                Arc::new(session.clone()),
                state,
                &cfg,
            ));
            gw.run(rx).await?;
            session.stop().await;

            if session.is_logged_out() {
                println!("WhatsApp logged this device out. Run `wabot pair --reset` to link again.");
            }
        }
        Commands::Status => {
            logging::init_cli(&cfg.bot.log_level);
            let session_dir = cfg.bot.session_dir();

            println!("🤖 {} — Status\n", cfg.bot.name);
            println!("Config:    {}", cli.config);
            println!("Data dir:  {}", cfg.bot.data_path().display());
            println!(
                "Session:   {}",
                if wabot_whatsapp::session_exists(&session_dir) {
                    "paired"
                } else {
                    "not paired (run `wabot pair`)"
                }
            );
            println!("Prefix:    {}", cfg.bot.prefix);
            println!();
            println!("  view-once saver: {}", on_off(cfg.features.view_once));
            println!("  status saver:    {}", on_off(cfg.features.status_saver));
            println!("  anti-delete:     {}", on_off(cfg.features.anti_delete));
            if let Some(target) = cfg.features.forward_target() {
                println!("  forward to:      {target}");
            }
            if cfg.dashboard.enabled {
                println!(
                    "  dashboard:       http://{}:{}",
                    cfg.dashboard.host, cfg.dashboard.port
                );
            } else {
                println!("  dashboard:       off");
            }
        }
        Commands::Pair { reset } => {
            logging::init_cli(&cfg.bot.log_level);
            pair(&cfg, reset).await?;
        }
    }

    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

/// Print rotating QR codes until the phone links the device.
async fn pair(cfg: &config::Config, reset: bool) -> anyhow::Result<()> {
    let session_dir = cfg.bot.session_dir();
    if !reset && wabot_whatsapp::session_exists(&session_dir) {
        println!("Already paired. Use `wabot pair --reset` to link again.");
        return Ok(());
    }

    let (mut qr_rx, mut done_rx) =
        wabot_whatsapp::start_pairing(&session_dir, &cfg.whatsapp.device_name, reset).await?;

    println!("Open WhatsApp on your phone → Linked devices → Link a device.\n");
    loop {
        tokio::select! {
            Some(code) = qr_rx.recv() => {
                let rendered = wabot_whatsapp::generate_qr_terminal(&code)?;
                println!("{rendered}");
            }
            done = done_rx.recv() => {
                if done.unwrap_or(false) {
                    println!("✅ Paired. Run `wabot start` to launch the bot.");
                    return Ok(());
                }
                anyhow::bail!("pairing ended before the device was linked");
            }
            _ = tokio::signal::ctrl_c() => {
                anyhow::bail!("pairing cancelled");
            }
        }
    }
}
