// MIT License - Copyright (c) 2026 Peter Wright
// pilight keypad/LCD console bridge
//
//! # pilight-console
//!
//! Bridges a serial keypad/LCD controller (a 20x4 character display
//! with an attached keypad, driven by an Arduino-class board) to a
//! pilight home automation daemon over TCP.
//!
//! Device updates from the daemon are rendered as status lines on the
//! display; alarm-class devices arm the console and take over the
//! screen until a pin-code disarm. A pin entry also unlocks a toggle
//! menu for switching devices from the keypad.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pilight_console::{Console, ConsoleConfig, DaemonLink, SerialLink, SourceLine};
//! use tokio::sync::mpsc::unbounded_channel;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConsoleConfig::load("/etc/pilight/pilightconsole.json")?;
//!
//!     let (line_tx, mut line_rx) = unbounded_channel::<SourceLine>();
//!     let (display_tx, display_rx) = unbounded_channel();
//!     let (daemon_tx, daemon_rx) = unbounded_channel();
//!
//!     let _serial = SerialLink::open(&config.serial_port, config.baud, display_rx, line_tx.clone())?;
//!     let _daemon = DaemonLink::connect(&config.pilight, daemon_rx, line_tx).await?;
//!
//!     let mut console = Console::new(config, display_tx, daemon_tx);
//!     console.send_identify();
//!
//!     while let Some(sourced) = line_rx.recv().await {
//!         match sourced.source {
//!             pilight_console::Source::Keypad => console.handle_keypad_line(&sourced.line),
//!             pilight_console::Source::Daemon => console.handle_daemon_line(&sourced.line),
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod alarm;
pub mod config;
pub mod console;
pub mod error;
pub mod event;
pub mod framing;
pub mod protocol;
pub mod transport;

// Re-exports for convenience
pub use alarm::{AlarmMachine, AlarmState};
pub use config::{AlarmDescriptor, ConsoleConfig, DeviceDescriptor, PilightEndpoint};
pub use console::{Console, SessionState};
pub use error::{ConsoleError, Result};
pub use event::{ConsoleEvent, EventReceiver};
pub use framing::LineFramer;
pub use protocol::{DaemonCommand, DisplayCommand, KeypadInput};
pub use transport::{DaemonLink, SerialLink, Source, SourceLine};
