//! Client handler module
//!
//! Runs one control connection from greeting to close on the calling worker
//! thread. Every failure here ends only this session.

use log::{debug, error, info, warn};
use std::io;
use std::sync::Arc;

use crate::client::session::{ControlLine, Session};
use crate::client::state::SessionState;
use crate::protocol::commands::{CommandStatus, parse_command};
use crate::protocol::handlers::handle_command;
use crate::protocol::responses::{self, format_response};
use crate::server::config::ServerConfig;
use crate::server::queue::Job;

/// Handles a single client session until QUIT, disconnect or a control
/// connection error.
pub fn handle_client(job: Job, config: Arc<ServerConfig>) {
    let peer = job.peer;
    info!("Client {} connected", peer);

    let root = match config.root_dir_path().canonicalize() {
        Ok(root) => root,
        Err(e) => {
            error!("Root directory {} is unusable: {}", config.root_dir, e);
            return;
        }
    };

    let mut session = match Session::new(job.stream, peer, SessionState::new(root), config) {
        Ok(session) => session,
        Err(e) => {
            warn!("Failed to set up session for {}: {}", peer, e);
            return;
        }
    };

    match run_session(&mut session) {
        Ok(()) => info!("Client {} disconnected", peer),
        Err(e) => warn!("Client {} dropped: {}", peer, e),
    }
}

fn run_session(session: &mut Session) -> io::Result<()> {
    let greeting = format_response(responses::READY, &session.config().welcome_message);
    session.send_reply(&greeting)?;

    loop {
        let line = match session.read_line()? {
            ControlLine::Command(line) => line,
            ControlLine::TooLong => {
                session.send_reply(&format_response(
                    responses::COMMAND_NOT_SUPPORTED,
                    "Command too long",
                ))?;
                continue;
            }
            ControlLine::Violation => {
                warn!("Client {} sent a line of bare CRs, closing", session.peer());
                return Ok(());
            }
            ControlLine::Closed => return Ok(()),
        };

        let command = parse_command(&line);
        debug!("Client {} sent {}", session.peer(), command.verb());

        let result = handle_command(session, &command)?;
        if let Some(message) = &result.message {
            session.send_reply(message)?;
        }

        match result.status {
            CommandStatus::Success => {}
            CommandStatus::Failure(reason) => {
                debug!("{} failed for {}: {}", command.verb(), session.peer(), reason)
            }
            CommandStatus::CloseConnection => return Ok(()),
        }
    }
}
