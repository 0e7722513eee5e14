//! TCP control server
//!
//! Exposes the session API on a line-oriented TCP connection: create and
//! stop sessions, list devices and sessions, and stream a broadcasting
//! session's frames over the same connection.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};
use wiretap_core::{Error, Result};
use wiretap_session::{OutputTarget, SessionConfig, SessionManager};
use wiretap_stream::Formatter;

use crate::command::{Command, CommandParser};

/// Control server for remote session management
pub struct ControlServer {
    /// Address to listen on, e.g. "127.0.0.1:9800"
    bind_addr: String,
    /// Shared session manager
    manager: Arc<SessionManager>,
    /// Connected client count
    client_count: Arc<parking_lot::RwLock<usize>>,
}

impl ControlServer {
    /// Create a new control server
    pub fn new(bind_addr: impl Into<String>, manager: Arc<SessionManager>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            manager,
            client_count: Arc::new(parking_lot::RwLock::new(0)),
        }
    }

    /// The session manager this server fronts
    pub fn manager(&self) -> Arc<SessionManager> {
        self.manager.clone()
    }

    /// Listen and serve until the process ends
    pub async fn start(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        info!("Wiretap control server listening on {}", self.bind_addr);

        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    info!("new connection from {peer_addr}");
                    *self.client_count.write() += 1;

                    let manager = self.manager.clone();
                    let client_count = self.client_count.clone();

                    tokio::spawn(async move {
                        if let Err(e) = Self::handle_client(socket, peer_addr, manager).await {
                            error!("error handling client {peer_addr}: {e}");
                        }
                        *client_count.write() -= 1;
                        info!("client {peer_addr} disconnected");
                    });
                }
                Err(e) => {
                    error!("failed to accept connection: {e}");
                }
            }
        }
    }

    /// Handle a client connection
    async fn handle_client(
        socket: TcpStream,
        peer_addr: SocketAddr,
        manager: Arc<SessionManager>,
    ) -> Result<()> {
        let (reader, mut writer) = socket.into_split();
        let mut reader = BufReader::new(reader);

        writer
            .write_all(b"Wiretap control connection. Type 'help' for commands.\r\n")
            .await?;

        let mut line = String::new();

        loop {
            writer.write_all(b"wiretap> ").await?;
            writer.flush().await?;

            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    debug!("client {peer_addr} closed connection");
                    break;
                }
                Ok(_) => {
                    let command_str = line.trim();
                    if command_str.is_empty() {
                        continue;
                    }

                    debug!("client {peer_addr} command: {command_str}");

                    match CommandParser::parse(command_str) {
                        Ok(Command::Stream { session_id }) => {
                            // Streaming takes over the connection; when it
                            // ends the client session ends with it
                            let streamed =
                                Self::cmd_stream(&mut reader, &mut writer, &manager, session_id)
                                    .await?;
                            if streamed {
                                break;
                            }
                        }
                        Ok(command) => {
                            match Self::execute_command(command, &mut writer, &manager).await {
                                Ok(should_exit) => {
                                    if should_exit {
                                        break;
                                    }
                                }
                                Err(e) => {
                                    Self::write_error(&mut writer, &e.to_string()).await?;
                                }
                            }
                        }
                        Err(e) => {
                            Self::write_error(&mut writer, &e).await?;
                        }
                    }
                }
                Err(e) => {
                    error!("error reading from client {peer_addr}: {e}");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Execute a non-streaming command
    async fn execute_command(
        command: Command,
        writer: &mut OwnedWriteHalf,
        manager: &Arc<SessionManager>,
    ) -> Result<bool> {
        match command {
            Command::Help => {
                writer.write_all(CommandParser::help_text().as_bytes()).await?;
            }
            Command::Devices => {
                Self::cmd_devices(writer).await?;
            }
            Command::Start { params } => {
                Self::cmd_start(writer, manager, params).await?;
            }
            Command::Stop { session_id } => {
                Self::cmd_stop(writer, manager, session_id).await?;
            }
            Command::List => {
                Self::cmd_list(writer, manager).await?;
            }
            Command::Stream { .. } => {
                // Handled by the caller; unreachable through this path
            }
            Command::Exit => {
                writer.write_all(b"Goodbye!\r\n").await?;
                writer.flush().await?;
                return Ok(true);
            }
        }

        writer.write_all(b"\r\n").await?;
        writer.flush().await?;
        Ok(false)
    }

    /// Devices command: JSON array of host devices
    async fn cmd_devices(writer: &mut OwnedWriteHalf) -> Result<()> {
        match wiretap_capture::list_devices() {
            Ok(devices) => {
                let json = serde_json::to_string(&devices)
                    .map_err(|e| Error::Format(e.to_string()))?;
                writer.write_all(json.as_bytes()).await?;
                writer.write_all(b"\r\n").await?;
            }
            Err(e) => {
                Self::write_error(writer, &e.to_string()).await?;
            }
        }
        Ok(())
    }

    /// Start command
    async fn cmd_start(
        writer: &mut OwnedWriteHalf,
        manager: &Arc<SessionManager>,
        params: HashMap<String, String>,
    ) -> Result<()> {
        let config = match session_config_from_params(&params) {
            Ok(config) => config,
            Err(e) => {
                Self::write_error(writer, &e.to_string()).await?;
                return Ok(());
            }
        };

        match manager.start_session(config).await {
            Ok(id) => {
                writer.write_all(format!("session {id}\r\n").as_bytes()).await?;
            }
            Err(e) => {
                Self::write_error(writer, &e.to_string()).await?;
            }
        }
        Ok(())
    }

    /// Stop command
    async fn cmd_stop(
        writer: &mut OwnedWriteHalf,
        manager: &Arc<SessionManager>,
        session_id: wiretap_core::SessionId,
    ) -> Result<()> {
        match manager.close_session(session_id) {
            Ok(()) => {
                writer
                    .write_all(format!("session {session_id} closed\r\n").as_bytes())
                    .await?;
            }
            Err(e) => {
                Self::write_error(writer, &e.to_string()).await?;
            }
        }
        Ok(())
    }

    /// List command
    async fn cmd_list(writer: &mut OwnedWriteHalf, manager: &Arc<SessionManager>) -> Result<()> {
        let sessions = manager.list();
        writer
            .write_all(format!("Active Sessions ({}):\r\n", sessions.len()).as_bytes())
            .await?;
        writer.write_all(b"==================\r\n").await?;

        if sessions.is_empty() {
            writer.write_all(b"No sessions currently running.\r\n").await?;
            return Ok(());
        }

        for info in sessions {
            writer.write_all(b"\r\n").await?;
            writer
                .write_all(format!("ID:        {}\r\n", info.id).as_bytes())
                .await?;
            writer
                .write_all(format!("Device:    {}\r\n", info.device).as_bytes())
                .await?;
            writer
                .write_all(format!("Filter:    {}\r\n", info.filter).as_bytes())
                .await?;
            writer
                .write_all(format!("Format:    {}\r\n", info.format).as_bytes())
                .await?;
            writer
                .write_all(format!("Output:    {}\r\n", info.output).as_bytes())
                .await?;
            writer
                .write_all(
                    format!(
                        "Started:   {}\r\n",
                        info.started_at.format("%Y-%m-%d %H:%M:%S UTC")
                    )
                    .as_bytes(),
                )
                .await?;
            writer
                .write_all(
                    format!(
                        "Frames:    {} captured, {} delivered ({} bytes)\r\n",
                        info.stats.frames_captured,
                        info.stats.frames_delivered,
                        info.stats.bytes_delivered
                    )
                    .as_bytes(),
                )
                .await?;
            if info.stats.records_dropped > 0 {
                writer
                    .write_all(
                        format!("Dropped:   {}\r\n", info.stats.records_dropped).as_bytes(),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Stream command: forward the session's frames on this connection
    ///
    /// Attaches one subscriber and forwards until the client disconnects,
    /// the session closes, or the broadcaster drops the subscriber for
    /// falling behind; then detaches exactly once.
    async fn cmd_stream(
        reader: &mut BufReader<OwnedReadHalf>,
        writer: &mut OwnedWriteHalf,
        manager: &Arc<SessionManager>,
        session_id: wiretap_core::SessionId,
    ) -> Result<bool> {
        let broadcaster = match manager.broadcaster(session_id) {
            Ok(broadcaster) => broadcaster,
            Err(e) => {
                Self::write_error(writer, &e.to_string()).await?;
                return Ok(false);
            }
        };

        let mut subscriber = broadcaster.attach();
        info!(session = %session_id, subscriber = %subscriber.id, "streaming started");

        writer
            .write_all(
                format!("streaming session {session_id}; close the connection to stop\r\n")
                    .as_bytes(),
            )
            .await?;
        writer.flush().await?;

        let mut discard = String::new();
        loop {
            tokio::select! {
                frame = subscriber.frames.recv() => match frame {
                    Some(frame) => {
                        if writer.write_all(&frame).await.is_err()
                            || writer.write_all(b"\n").await.is_err()
                        {
                            break;
                        }
                    }
                    // Session closed or this subscriber was dropped
                    None => break,
                },
                read = reader.read_line(&mut discard) => match read {
                    Ok(0) | Err(_) => break,
                    Ok(_) => discard.clear(),
                },
            }
        }

        broadcaster.detach(subscriber.id);
        info!(session = %session_id, subscriber = %subscriber.id, "streaming stopped");
        Ok(true)
    }

    /// Write error message
    async fn write_error(writer: &mut OwnedWriteHalf, error: &str) -> Result<()> {
        writer.write_all(format!("Error: {error}\r\n").as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }
}

/// Build a session configuration from start command parameters
///
/// Unknown keys and malformed values are configuration errors, reported
/// before any resource is touched.
fn session_config_from_params(params: &HashMap<String, String>) -> Result<SessionConfig> {
    let device = params
        .get("device")
        .ok_or_else(|| Error::config("missing required parameter 'device'"))?;

    let mut config = SessionConfig::new(device);

    for (key, value) in params {
        match key.as_str() {
            "device" => {}
            "filter" => config.filter = value.clone(),
            "snaplen" => {
                config.snaplen = value
                    .parse()
                    .map_err(|_| Error::config(format!("invalid snaplen '{value}'")))?;
            }
            "promisc" => {
                config.promiscuous = value
                    .parse()
                    .map_err(|_| Error::config(format!("invalid promisc flag '{value}'")))?;
            }
            "timeout-ms" => {
                config.timeout_ms = value
                    .parse()
                    .map_err(|_| Error::config(format!("invalid timeout-ms '{value}'")))?;
            }
            "format" => config.format = value.parse::<Formatter>()?,
            "output" => config.output = value.parse::<OutputTarget>()?,
            other => {
                return Err(Error::config(format!("unknown parameter '{other}'")));
            }
        }
    }

    Ok(config)
}
