// MIT License - Copyright (c) 2026 Peter Wright

use std::io::{Read, Write};
use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

use crate::error::{ConsoleError, Result};
use crate::framing::LineFramer;
use crate::protocol::DisplayCommand;
use crate::transport::SourceLine;

/// How long a blocking serial read waits before yielding. Timeouts are
/// not errors; the reader just polls again.
const READ_TIMEOUT: Duration = Duration::from_millis(250);

/// Serial link to the keypad/LCD controller.
///
/// serialport I/O is blocking, so the link runs a plain reader thread
/// and writer thread around a cloned port handle. The reader frames
/// inbound bytes into lines for the dispatch channel; the writer drains
/// display commands and terminates each with `\n`. Both threads exit on
/// their own when the port fails or the channels close.
pub struct SerialLink {
    reader: std::thread::JoinHandle<()>,
    writer: std::thread::JoinHandle<()>,
}

impl SerialLink {
    pub fn open(
        path: &str,
        baud: u32,
        command_rx: UnboundedReceiver<DisplayCommand>,
        line_tx: UnboundedSender<SourceLine>,
    ) -> Result<Self> {
        let port = serialport::new(path, baud)
            .timeout(READ_TIMEOUT)
            .open()?;
        let write_port = port.try_clone()?;
        info!("Opened serial port {} at {} baud", path, baud);

        Ok(Self {
            reader: std::thread::spawn(move || read_loop(port, line_tx)),
            writer: std::thread::spawn(move || write_loop(write_port, command_rx)),
        })
    }

    pub fn is_alive(&self) -> bool {
        !self.reader.is_finished() && !self.writer.is_finished()
    }
}

fn read_loop(mut port: Box<dyn serialport::SerialPort>, line_tx: UnboundedSender<SourceLine>) {
    let mut framer = LineFramer::new();
    let mut buf = [0u8; 256];
    loop {
        match port.read(&mut buf) {
            Ok(0) => continue,
            Ok(n) => match framer.feed(&buf[..n]) {
                Ok(lines) => {
                    for line in lines {
                        if line_tx.send(SourceLine::keypad(line)).is_err() {
                            return;
                        }
                    }
                }
                Err(ConsoleError::FramingOverflow { limit, recovered }) => {
                    warn!("Serial stream discarded an unterminated message past {} bytes", limit);
                    for line in recovered {
                        if line_tx.send(SourceLine::keypad(line)).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    error!("Serial framing error: {}", e);
                    return;
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
            Err(e) => {
                error!("Serial read error: {}", e);
                return;
            }
        }
    }
}

fn write_loop(
    mut port: Box<dyn serialport::SerialPort>,
    mut command_rx: UnboundedReceiver<DisplayCommand>,
) {
    while let Some(command) = command_rx.blocking_recv() {
        let mut wire = command.to_wire_string();
        debug!("SERIAL> {}", wire);
        wire.push('\n');
        if let Err(e) = port.write_all(wire.as_bytes()).and_then(|_| port.flush()) {
            error!("Serial write error: {}", e);
            return;
        }
    }
}
