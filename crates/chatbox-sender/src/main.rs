//! Chatbox sender entry point.
//!
//! Reads lines from stdin and forwards them to a VRChat-compatible OSC
//! chatbox endpoint, respecting the chatbox rate limit.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load config + CLI overrides
//!  └─ UdpTransmitter         -- OSC over UDP to the destination
//!  └─ SendCoordinator        -- debounce + rate limit
//!       └─ RateLimiter       -- tokio-scheduled retries
//!  └─ stdin line loop        -- console::parse_line → coordinator
//! ```
//!
//! # Usage
//!
//! ```bash
//! chatbox-sender --destination 192.168.1.20:9000 --auto-send
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use chatbox_sender::application::send_coordinator::{SendCoordinator, SendKind};
use chatbox_sender::infrastructure::console::{parse_line, submit, ConsoleCommand};
use chatbox_sender::infrastructure::network::UdpTransmitter;
use chatbox_sender::infrastructure::storage::config::{self, AppConfig};
use chatbox_sender::infrastructure::timing::{TokioClock, TokioScheduler};

/// Command-line arguments.  Each overrides the matching config file value.
#[derive(Debug, Parser)]
#[command(
    name = "chatbox-sender",
    about = "Send console text to an OSC chatbox with rate limiting",
    version
)]
struct Cli {
    /// OSC destination as IP:PORT (a bare IP uses port 9000).
    #[arg(long, env = "CHATBOX_DESTINATION")]
    destination: Option<String>,

    /// Soft-send `~`-prefixed draft lines as they are entered.
    #[arg(long, env = "CHATBOX_AUTO_SEND")]
    auto_send: bool,

    /// Keep the text after a message is sent.
    #[arg(long)]
    no_clear_on_send: bool,

    /// Do not send typing indicators.
    #[arg(long)]
    no_typing: bool,

    /// Config file to use instead of the platform default.
    #[arg(long, env = "CHATBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Write the effective configuration back to the config file.
    #[arg(long)]
    save_config: bool,
}

impl Cli {
    fn apply_to(&self, cfg: &mut AppConfig) {
        if let Some(destination) = &self.destination {
            cfg.sender.destination = destination.clone();
        }
        if self.auto_send {
            cfg.sender.auto_send = true;
        }
        if self.no_clear_on_send {
            cfg.sender.clear_on_send = false;
        }
        if self.no_typing {
            cfg.sender.send_typing = false;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut cfg, config_load_error) = match load_config(&cli) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    cli.apply_to(&mut cfg);

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.sender.log_level)),
        )
        .init();

    if let Some(e) = config_load_error {
        warn!("using default configuration: {e:#}");
    }

    if cli.save_config {
        let path = match &cli.config {
            Some(path) => config::save_config_to(&cfg, path).map(|()| path.clone()),
            None => config::save_config(&cfg),
        }
        .context("failed to save configuration")?;
        info!("configuration saved to {}", path.display());
    }

    let transmitter = Arc::new(UdpTransmitter::bind().context("failed to open UDP socket")?);
    if let Err(e) = transmitter.set_destination(&cfg.sender.destination) {
        warn!("{e}; use /dest <ip:port> to set one");
    }

    let coordinator = SendCoordinator::new(
        cfg.send_policy(),
        transmitter.clone(),
        Arc::new(TokioClock),
        Arc::new(TokioScheduler::current()),
    )
    .context("invalid rate limit configuration")?;

    info!(
        auto_send = cfg.sender.auto_send,
        typing = cfg.sender.send_typing,
        "chatbox sender ready; type a message and press Enter (/quit to exit)"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        };
        let Some(line) = line else {
            debug!("stdin closed");
            break;
        };

        match parse_line(&line, cfg.sender.auto_send) {
            ConsoleCommand::Submit(text) => {
                submit(&coordinator, &text, cfg.sender.clear_on_send);
            }
            ConsoleCommand::Draft(text) => {
                coordinator.on_text_changed(&text);
                coordinator.request_send(SendKind::Soft);
            }
            ConsoleCommand::SetDestination(addr) => match transmitter.set_destination(&addr) {
                Ok(addr) => info!("sending to {addr}"),
                Err(e) => warn!("{e}"),
            },
            ConsoleCommand::SetTyping(enabled) => coordinator.set_typing_enabled(enabled),
            ConsoleCommand::Clear => {
                coordinator.on_text_changed("");
                coordinator.request_send(SendKind::Soft);
            }
            ConsoleCommand::Quit => break,
            ConsoleCommand::Nothing => {}
            ConsoleCommand::Invalid(msg) => warn!("{msg}"),
        }
    }

    coordinator.dispose();
    info!("chatbox sender stopped");
    Ok(())
}

fn load_config(cli: &Cli) -> Result<AppConfig, config::ConfigError> {
    match &cli.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    }
}
