// MIT License - Copyright (c) 2026 Peter Wright

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::PilightEndpoint;
use crate::error::{ConsoleError, Result};
use crate::framing::LineFramer;
use crate::protocol::DaemonCommand;
use crate::transport::SourceLine;

/// TCP link to the pilight daemon.
///
/// Owns a reader task that frames inbound bytes into lines for the
/// dispatch channel and a writer task that serializes outbound
/// commands, each terminated with `\r\n`. Both tasks are aborted when
/// the link is dropped.
pub struct DaemonLink {
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl DaemonLink {
    pub async fn connect(
        endpoint: &PilightEndpoint,
        command_rx: UnboundedReceiver<DaemonCommand>,
        line_tx: UnboundedSender<SourceLine>,
    ) -> Result<Self> {
        let stream = TcpStream::connect((endpoint.server.as_str(), endpoint.port)).await?;
        stream.set_nodelay(true)?;
        info!("Connected to pilight daemon at {}:{}", endpoint.server, endpoint.port);

        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: tokio::spawn(read_loop(read_half, line_tx)),
            writer: tokio::spawn(write_loop(write_half, command_rx)),
        })
    }

    /// Whether both halves of the link are still running.
    pub fn is_alive(&self) -> bool {
        !self.reader.is_finished() && !self.writer.is_finished()
    }
}

impl Drop for DaemonLink {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

async fn read_loop(mut read_half: impl AsyncRead + Unpin, line_tx: UnboundedSender<SourceLine>) {
    let mut framer = LineFramer::new();
    let mut buf = [0u8; 4096];
    loop {
        match read_half.read(&mut buf).await {
            Ok(0) => {
                warn!("pilight daemon closed the connection");
                return;
            }
            Ok(n) => match framer.feed(&buf[..n]) {
                Ok(lines) => {
                    for line in lines {
                        if line_tx.send(SourceLine::daemon(line)).is_err() {
                            return;
                        }
                    }
                }
                Err(ConsoleError::FramingOverflow { limit, recovered }) => {
                    warn!("Daemon stream discarded an unterminated message past {} bytes", limit);
                    for line in recovered {
                        if line_tx.send(SourceLine::daemon(line)).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    error!("Daemon framing error: {}", e);
                    return;
                }
            },
            Err(e) => {
                error!("Daemon read error: {}", e);
                return;
            }
        }
    }
}

async fn write_loop(
    mut write_half: impl AsyncWrite + Unpin,
    mut command_rx: UnboundedReceiver<DaemonCommand>,
) {
    while let Some(command) = command_rx.recv().await {
        let mut wire = command.to_wire_string();
        debug!("SOCKET> {}", wire);
        wire.push_str("\r\n");
        if let Err(e) = write_half.write_all(wire.as_bytes()).await {
            error!("Daemon write error: {}", e);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test]
    async fn test_read_loop_frames_and_tags_lines() {
        let (mut client, server) = tokio::io::duplex(1024);
        let (line_tx, mut line_rx) = unbounded_channel();
        let handle = tokio::spawn(read_loop(server, line_tx));

        client
            .write_all(b"{\"status\":\"success\"}\r\n{\"mes")
            .await
            .unwrap();
        client.write_all(b"sage\":\"values\"}\r\n").await.unwrap();
        drop(client);

        assert_eq!(
            line_rx.recv().await,
            Some(SourceLine::daemon("{\"status\":\"success\"}"))
        );
        assert_eq!(
            line_rx.recv().await,
            Some(SourceLine::daemon("{\"message\":\"values\"}"))
        );
        assert_eq!(line_rx.recv().await, None);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_is_alive_tracks_remote_close() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = PilightEndpoint {
            server: "127.0.0.1".to_string(),
            port: listener.local_addr().unwrap().port(),
        };
        let (_command_tx, command_rx) = unbounded_channel();
        let (line_tx, _line_rx) = unbounded_channel();
        let link = DaemonLink::connect(&endpoint, command_rx, line_tx)
            .await
            .unwrap();
        let (remote, _) = listener.accept().await.unwrap();
        assert!(link.is_alive());

        // Remote hangup finishes the reader half
        drop(remote);
        for _ in 0..50 {
            if !link.is_alive() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("link still reported alive after remote close");
    }

    #[tokio::test]
    async fn test_write_loop_appends_crlf() {
        let (server, mut client) = tokio::io::duplex(1024);
        let (command_tx, command_rx) = unbounded_channel();
        let handle = tokio::spawn(write_loop(server, command_rx));

        command_tx.send(DaemonCommand::RequestValues).unwrap();
        drop(command_tx);
        handle.await.unwrap();

        let mut out = String::new();
        client.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "{\"action\":\"request values\"}\r\n");
    }
}
