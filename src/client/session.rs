//! Client session management
//!
//! A `Session` owns one control connection: the buffered reader for command
//! lines, the writer for replies, the peer/local addresses and the protocol
//! state.

use log::debug;
use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;

use crate::client::state::SessionState;
use crate::error::DataChannelError;
use crate::server::config::ServerConfig;
use crate::transfer::data_channel::connect_active;
use crate::transfer::modes::DataChannel;

/// Outcome of reading one control line.
#[derive(Debug, PartialEq, Eq)]
pub enum ControlLine {
    /// A command line with its CR/LF terminator removed.
    Command(String),
    /// The line exceeded the configured maximum length and was discarded.
    TooLong,
    /// The line consisted only of CR characters.
    Violation,
    /// The peer closed the connection.
    Closed,
}

pub struct Session {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    peer: SocketAddr,
    local: SocketAddr,
    state: SessionState,
    config: Arc<ServerConfig>,
}

impl Session {
    pub fn new(
        stream: TcpStream,
        peer: SocketAddr,
        state: SessionState,
        config: Arc<ServerConfig>,
    ) -> io::Result<Self> {
        let local = stream.local_addr()?;
        let writer = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
            peer,
            local,
            state,
            config,
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Local address the client reached this server on.
    pub fn local(&self) -> SocketAddr {
        self.local
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Writes a complete reply line to the control connection.
    pub fn send_reply(&mut self, reply: &str) -> io::Result<()> {
        debug!("Reply to {}: {}", self.peer, reply.trim_end());
        self.writer.write_all(reply.as_bytes())?;
        self.writer.flush()
    }

    /// Reads the next LF-terminated control line.
    pub fn read_line(&mut self) -> io::Result<ControlLine> {
        let limit = self.config.max_command_length;
        let mut line = Vec::new();
        let mut overflow = false;

        loop {
            let available = self.reader.fill_buf()?;
            if available.is_empty() {
                // EOF mid-line still ends the session.
                return Ok(ControlLine::Closed);
            }

            let (chunk, found_newline) = match available.iter().position(|&b| b == b'\n') {
                Some(idx) => (&available[..idx], true),
                None => (available, false),
            };
            if !overflow {
                if line.len() + chunk.len() > limit {
                    overflow = true;
                    line.clear();
                } else {
                    line.extend_from_slice(chunk);
                }
            }

            let consumed = chunk.len() + usize::from(found_newline);
            self.reader.consume(consumed);
            if found_newline {
                break;
            }
        }

        if overflow {
            return Ok(ControlLine::TooLong);
        }
        Ok(classify_line(&line))
    }

    /// Opens the data connection for a transfer according to the current
    /// mode: connect back to the control peer (active) or accept on the
    /// pending listener (passive).
    pub fn open_data_connection(&mut self) -> Result<TcpStream, DataChannelError> {
        debug!(
            "Opening {:?} data connection for {} (PORT {:?})",
            self.state.transfer_mode(),
            self.peer,
            self.state.active_port()
        );
        match self.state.take_data_channel() {
            DataChannel::Active(Some(port)) => {
                connect_active(self.peer.ip(), port, self.config.connection_timeout())
            }
            DataChannel::Active(None) | DataChannel::Passive(None) => {
                Err(DataChannelError::NotConfigured)
            }
            DataChannel::Passive(Some(listener)) => listener.accept(),
        }
    }
}

/// Strips the CR/LF terminator and flags lines made only of CR characters.
fn classify_line(raw: &[u8]) -> ControlLine {
    if !raw.is_empty() && raw.iter().all(|&b| b == b'\r') {
        return ControlLine::Violation;
    }

    let end = raw
        .iter()
        .rposition(|&b| b != b'\r')
        .map_or(0, |idx| idx + 1);
    ControlLine::Command(String::from_utf8_lossy(&raw[..end]).into_owned())
}
