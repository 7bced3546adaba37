// MIT License - Copyright (c) 2026 Peter Wright
// pilight keypad/LCD console bridge

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc::unbounded_channel;
use tokio::time::{interval, sleep, Duration};
use tracing::{debug, info, warn};

use pilight_console::{Console, ConsoleConfig, DaemonLink, SerialLink, Source, SourceLine};

/// Opening the serial port resets Arduino-class controllers; give the
/// firmware time to boot before the banner.
const CONTROLLER_RESET_WAIT: Duration = Duration::from_secs(5);

/// How often the registration handshake is retried until the daemon
/// acknowledges it.
const IDENTIFY_RETRY: Duration = Duration::from_secs(3);

/// How often the transport links are checked for dead reader/writer
/// halves.
const LINK_CHECK_INTERVAL: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "pilight-console")]
#[command(about = "Bridge between a serial keypad/LCD console and a pilight daemon")]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, default_value = "/etc/pilight/pilightconsole.json")]
    config: String,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or RUST_LOG=pilight_console=trace).
    // Default: info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt().without_time().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();

    let config = ConsoleConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config file {}", cli.config))?;
    info!(
        "Monitoring {} device(s) and {} alarm(s)",
        config.devices.len(),
        config.alarms.len()
    );
    for (name, device) in &config.devices {
        debug!("Device '{}' ({}) on row {}", name, device.friendly_name, device.line);
    }
    for (name, alarm) in &config.alarms {
        debug!(
            "Alarm '{}' ({}) trigger='{}' reset='{}'",
            name, alarm.friendly_name, alarm.trigger_value, alarm.reset_value
        );
    }

    let (line_tx, mut line_rx) = unbounded_channel::<SourceLine>();
    let (display_tx, display_rx) = unbounded_channel();
    let (daemon_tx, daemon_rx) = unbounded_channel();

    let serial = SerialLink::open(&config.serial_port, config.baud, display_rx, line_tx.clone())?;
    let daemon = DaemonLink::connect(&config.pilight, daemon_rx, line_tx).await?;

    let mut console = Console::new(config, display_tx, daemon_tx);

    // Log console events at debug so RUST_LOG=debug traces the full flow
    let mut events = console.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            debug!("Event: {:?}", event);
        }
    });

    info!("Waiting for the display controller to boot...");
    sleep(CONTROLLER_RESET_WAIT).await;
    console.greet();

    // Retry the handshake until the daemon reports success, dispatching
    // inbound lines the whole time
    let mut retry = interval(IDENTIFY_RETRY);
    while !console.is_registered() {
        tokio::select! {
            _ = retry.tick() => {
                info!("Registering with the pilight daemon...");
                console.send_identify();
            }
            sourced = line_rx.recv() => match sourced {
                Some(sourced) => dispatch(&mut console, sourced),
                None => anyhow::bail!("All transport links closed during registration"),
            }
        }
    }
    info!("Registered with the pilight daemon");
    console.request_values();

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut link_check = interval(LINK_CHECK_INTERVAL);
    info!("Console bridge running. Send SIGINT/SIGTERM to stop.");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, shutting down...");
                break;
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                break;
            }
            _ = link_check.tick() => {
                if !serial.is_alive() {
                    warn!("Serial link lost, shutting down");
                    break;
                }
                if !daemon.is_alive() {
                    warn!("Daemon link lost, shutting down");
                    break;
                }
            }
            sourced = line_rx.recv() => match sourced {
                Some(sourced) => dispatch(&mut console, sourced),
                None => {
                    warn!("All transport links closed");
                    break;
                }
            }
        }
    }

    info!("Shutdown complete");
    Ok(())
}

fn dispatch(console: &mut Console, sourced: SourceLine) {
    match sourced.source {
        Source::Keypad => console.handle_keypad_line(&sourced.line),
        Source::Daemon => console.handle_daemon_line(&sourced.line),
    }
}
