//! Command handlers module for the FTP server.
//!
//! This module defines handler functions for FTP commands: session setup,
//! directory navigation, data channel negotiation, and the transfer
//! commands that move files and listings over the data connection.
//!
//! Every handler answers with a `CommandResult` whose message is the final
//! reply line. Transfer commands additionally send a preliminary `150` reply
//! themselves before opening the data connection; only a failure to write on
//! the control connection is returned as `Err`.

use log::{info, warn};
use std::fs::File;
use std::io::{self, Write};
use std::net::{Shutdown, TcpStream};
use std::path::Path;

use crate::client::Session;
use crate::error::{DataChannelError, ProtocolError, StorageError, TransferError};
use crate::navigate::change_directory;
use crate::protocol::commands::{Command, CommandResult, first_argument};
use crate::protocol::responses::{self, format_response};
use crate::storage::list_directory;
use crate::storage::operations::{
    create_exclusive, make_directory, open_for_append, open_for_read, remove_directory,
    resolve_path,
};
use crate::transfer::data_channel::{
    PassiveListener, format_epsv_tuple, format_pasv_tuple, parse_port_argument,
};
use crate::transfer::file_ops::transfer;
use crate::transfer::modes::TransferType;
use crate::utils::network::passive_ipv4;

/// Dispatches a received FTP command to its corresponding handler.
///
/// # Arguments
///
/// * `session` - The session that received the command.
/// * `command` - The parsed FTP command.
///
/// # Returns
///
/// * `CommandResult` - Result of the command execution, including status and
///   the final reply line.
pub fn handle_command(session: &mut Session, command: &Command) -> io::Result<CommandResult> {
    match command {
        Command::User(args) => Ok(handle_cmd_user(session, args)),
        Command::Pass(_) => Ok(handle_cmd_pass(session)),
        Command::Syst => Ok(handle_cmd_syst()),
        Command::Feat => Ok(handle_cmd_feat()),
        Command::Pwd => Ok(handle_cmd_pwd(session)),
        Command::Type(args) => Ok(handle_cmd_type(session, args)),
        Command::Cwd(args) => Ok(handle_cmd_cwd(session, args)),
        Command::Port(args) => Ok(handle_cmd_port(session, args)),
        Command::Pasv => Ok(handle_cmd_pasv(session)),
        Command::Epsv => Ok(handle_cmd_epsv(session)),
        Command::List => handle_cmd_list(session),
        Command::Retr(args) => handle_cmd_retr(session, args),
        Command::Stor(args) => handle_cmd_stor(session, args),
        Command::Appe(args) => handle_cmd_appe(session, args),
        Command::Rmd(args) => Ok(handle_cmd_rmd(session, args)),
        Command::Mkd(args) => Ok(handle_cmd_mkd(session, args)),
        Command::Quit => Ok(handle_cmd_quit(session)),
        Command::Unknown(verb) => Ok(handle_cmd_unknown(verb)),
    }
}

fn protocol_failure(err: ProtocolError) -> CommandResult {
    let text = match err {
        ProtocolError::UnknownCommand(_) => "Command not supported",
        ProtocolError::MissingArgument(_) | ProtocolError::InvalidPortArgument(_) => {
            "Syntax error in parameters or arguments"
        }
        ProtocolError::UnsupportedType(_) => "Command not implemented for that parameter",
    };
    let message = format_response(err.ftp_code(), text);
    CommandResult::failure(err.to_string(), message)
}

/// Handles the USER command. Any name is accepted.
fn handle_cmd_user(session: &mut Session, args: &str) -> CommandResult {
    let username = args.split(' ').next().unwrap_or_default();
    session.state_mut().user(username);
    CommandResult::success(format_response(
        responses::PASSWORD_REQUIRED,
        &format!("Password required for {}", username),
    ))
}

/// Handles the PASS command. Any password logs the session in.
fn handle_cmd_pass(session: &mut Session) -> CommandResult {
    session.state_mut().pass();
    info!("Client {} logged in", session.peer());
    CommandResult::success(format_response(
        responses::LOGIN_SUCCESS,
        "You are now logged in.",
    ))
}

fn handle_cmd_syst() -> CommandResult {
    CommandResult::success(format_response(responses::SYSTEM_TYPE, "UNIX Type: L8"))
}

fn handle_cmd_feat() -> CommandResult {
    CommandResult::success(format_response(
        responses::EXTENSIONS_SUPPORTED,
        "Extensions supported",
    ))
}

fn handle_cmd_pwd(session: &Session) -> CommandResult {
    let cwd = session.state().cwd().display().to_string();
    CommandResult::success(format_response(
        responses::PATH_CREATED,
        &format!("\"{}\"", cwd),
    ))
}

/// Handles TYPE: `A` selects ASCII, `I` selects binary.
fn handle_cmd_type(session: &mut Session, args: &str) -> CommandResult {
    let parsed = first_argument(args, "TYPE").and_then(TransferType::from_type_code);
    match parsed {
        Ok(transfer_type) => {
            session.state_mut().set_transfer_type(transfer_type);
            let text = match transfer_type {
                TransferType::Ascii => "Switching to ASCII mode",
                TransferType::Binary => "Switching to binary mode",
            };
            CommandResult::success(format_response(responses::OK, text))
        }
        Err(e) => protocol_failure(e),
    }
}

/// Handles CWD: the working directory only changes when the target resolves
/// to an existing directory.
fn handle_cmd_cwd(session: &mut Session, args: &str) -> CommandResult {
    let target = match first_argument(args, "CWD") {
        Ok(target) => target,
        Err(e) => return protocol_failure(e),
    };

    match change_directory(session.state().cwd(), target) {
        Ok(new_cwd) => {
            info!("Client {} changed directory to {}", session.peer(), new_cwd.display());
            session.state_mut().set_cwd(new_cwd);
            CommandResult::success(format_response(
                responses::FILE_ACTION_OK,
                "Directory successfully changed",
            ))
        }
        Err(e) => {
            warn!("CWD failed for client {}: {}", session.peer(), e);
            CommandResult::failure(
                e.to_string(),
                format_response(responses::FILE_NOT_FOUND, "Failed to change directory"),
            )
        }
    }
}

/// Handles PORT: records the client's data port and switches to active mode.
/// The host fields are ignored in favour of the control connection's peer.
fn handle_cmd_port(session: &mut Session, args: &str) -> CommandResult {
    let port = match first_argument(args, "PORT").and_then(parse_port_argument) {
        Ok(port) => port,
        Err(e) => return protocol_failure(e),
    };

    session.state_mut().enter_active(port);
    info!("Client {} entered active mode on port {}", session.peer(), port);
    CommandResult::success(format_response(responses::OK, "Entering active mode"))
}

/// Binds a passive listener on the address the client reached us on.
fn open_passive(session: &mut Session) -> Result<u16, CommandResult> {
    let bind_ip = session.local().ip();
    match PassiveListener::open(bind_ip, session.config()) {
        Ok(listener) => {
            let port = listener.port();
            session.state_mut().enter_passive(listener);
            info!("Client {} entered passive mode on port {}", session.peer(), port);
            Ok(port)
        }
        Err(e) => {
            warn!("Passive mode failed for client {}: {}", session.peer(), e);
            Err(CommandResult::failure(
                e.to_string(),
                format_response(e.ftp_code(), "Can't open data connection"),
            ))
        }
    }
}

fn handle_cmd_pasv(session: &mut Session) -> CommandResult {
    let Some(advertised) = passive_ipv4(session.config().passive_ipv4(), session.local()) else {
        let err = DataChannelError::NoPassiveAddress;
        warn!("PASV failed for client {}: {}", session.peer(), err);
        return CommandResult::failure(
            err.to_string(),
            format_response(err.ftp_code(), "Can't open data connection"),
        );
    };

    match open_passive(session) {
        Ok(port) => CommandResult::success(format_response(
            responses::ENTERING_PASSIVE,
            &format!("Entering passive mode. {}", format_pasv_tuple(advertised, port)),
        )),
        Err(result) => result,
    }
}

fn handle_cmd_epsv(session: &mut Session) -> CommandResult {
    match open_passive(session) {
        Ok(port) => CommandResult::success(format_response(
            responses::ENTERING_EXTENDED_PASSIVE,
            &format!("Entering passive mode. {}", format_epsv_tuple(port)),
        )),
        Err(result) => result,
    }
}

/// Sends the preliminary reply, opens the data connection, runs `body` on it
/// and closes it again. Maps data-connection failures to `425` and transfer
/// failures to `451`.
fn run_data_transfer<F>(
    session: &mut Session,
    verb: &str,
    done_text: &str,
    body: F,
) -> io::Result<CommandResult>
where
    F: FnOnce(&mut TcpStream, TransferType, usize) -> Result<u64, TransferError>,
{
    let transfer_type = session.state().transfer_type();
    session.send_reply(&format_response(
        responses::FILE_STATUS_OK,
        &format!("Opening {} mode data connection", transfer_type.label()),
    ))?;

    let mut data_stream = match session.open_data_connection() {
        Ok(stream) => stream,
        Err(e) => {
            warn!("{} data connection failed for client {}: {}", verb, session.peer(), e);
            return Ok(CommandResult::failure(
                e.to_string(),
                format_response(e.ftp_code(), "Can't open data connection"),
            ));
        }
    };

    let outcome = body(&mut data_stream, transfer_type, session.config().buffer_size);
    let _ = data_stream.shutdown(Shutdown::Both);
    drop(data_stream);

    match outcome {
        Ok(bytes) => {
            info!("{} for client {} finished: {} bytes", verb, session.peer(), bytes);
            Ok(CommandResult::success(format_response(
                responses::TRANSFER_COMPLETE,
                done_text,
            )))
        }
        Err(e) => {
            warn!("{} for client {} aborted: {}", verb, session.peer(), e);
            Ok(CommandResult::failure(
                e.to_string(),
                format_response(e.ftp_code(), "Local error in file processing"),
            ))
        }
    }
}

/// Handles LIST: sends the visible entries of the working directory.
fn handle_cmd_list(session: &mut Session) -> io::Result<CommandResult> {
    let listing = match list_directory(session.state().cwd()) {
        Ok(listing) => listing,
        Err(e) => {
            warn!("LIST failed for client {}: {}", session.peer(), e);
            return Ok(CommandResult::failure(
                e.to_string(),
                format_response(responses::FILE_NOT_FOUND, "Failed to list directory"),
            ));
        }
    };

    run_data_transfer(session, "LIST", "Directory contents listed", move |stream, _, _| {
        stream
            .write_all(&listing)
            .and_then(|_| stream.flush())
            .map(|_| listing.len() as u64)
            .map_err(TransferError::Write)
    })
}

/// Handles RETR: streams a file to the client.
fn handle_cmd_retr(session: &mut Session, args: &str) -> io::Result<CommandResult> {
    let filename = match first_argument(args, "RETR") {
        Ok(filename) => filename,
        Err(e) => return Ok(protocol_failure(e)),
    };
    let path = resolve_path(session.state().cwd(), filename);

    let file = match open_for_read(&path) {
        Ok(file) => file,
        Err(e) => {
            warn!("RETR failed for client {}: {}", session.peer(), e);
            return Ok(CommandResult::failure(
                e.to_string(),
                format_response(responses::FILE_NOT_FOUND, "Error during file access"),
            ));
        }
    };

    info!("Client {} retrieving {}", session.peer(), path.display());
    run_data_transfer(session, "RETR", "Transfer complete", move |stream, ty, buffer| {
        transfer(file, stream, ty, buffer)
    })
}

/// Handles STOR: the target must not exist yet.
fn handle_cmd_stor(session: &mut Session, args: &str) -> io::Result<CommandResult> {
    store(session, args, "STOR", create_exclusive)
}

/// Handles APPE: appends to the target, creating it if needed.
fn handle_cmd_appe(session: &mut Session, args: &str) -> io::Result<CommandResult> {
    store(session, args, "APPE", open_for_append)
}

fn store(
    session: &mut Session,
    args: &str,
    verb: &'static str,
    open: fn(&Path) -> Result<File, StorageError>,
) -> io::Result<CommandResult> {
    let filename = match first_argument(args, verb) {
        Ok(filename) => filename,
        Err(e) => return Ok(protocol_failure(e)),
    };
    let path = resolve_path(session.state().cwd(), filename);

    let file = match open(&path) {
        Ok(file) => file,
        Err(e) => {
            warn!("{} failed for client {}: {}", verb, session.peer(), e);
            return Ok(CommandResult::failure(
                e.to_string(),
                format_response(responses::FILE_UNAVAILABLE, "File unavailable"),
            ));
        }
    };

    info!("Client {} storing {} ({})", session.peer(), path.display(), verb);
    run_data_transfer(session, verb, "Transfer complete", move |stream, ty, buffer| {
        transfer(stream, file, ty, buffer)
    })
}

fn handle_cmd_rmd(session: &mut Session, args: &str) -> CommandResult {
    let dirname = match first_argument(args, "RMD") {
        Ok(dirname) => dirname,
        Err(e) => return protocol_failure(e),
    };
    let path = resolve_path(session.state().cwd(), dirname);

    match remove_directory(&path) {
        Ok(()) => {
            info!("Client {} removed directory {}", session.peer(), path.display());
            CommandResult::success(format_response(
                responses::TRANSFER_COMPLETE,
                "Removal complete",
            ))
        }
        Err(e) => {
            warn!("RMD failed for client {}: {}", session.peer(), e);
            CommandResult::failure(
                e.to_string(),
                format_response(
                    responses::LOCAL_PROCESSING_ERROR,
                    "Local error in processing",
                ),
            )
        }
    }
}

fn handle_cmd_mkd(session: &mut Session, args: &str) -> CommandResult {
    let dirname = match first_argument(args, "MKD") {
        Ok(dirname) => dirname,
        Err(e) => return protocol_failure(e),
    };
    let path = resolve_path(session.state().cwd(), dirname);

    match make_directory(&path) {
        Ok(()) => {
            info!("Client {} created directory {}", session.peer(), path.display());
            CommandResult::success(format_response(
                responses::TRANSFER_COMPLETE,
                "Directory creation complete",
            ))
        }
        Err(e) => {
            warn!("MKD failed for client {}: {}", session.peer(), e);
            CommandResult::failure(
                e.to_string(),
                format_response(
                    responses::LOCAL_PROCESSING_ERROR,
                    "Local error in processing",
                ),
            )
        }
    }
}

/// Handles the QUIT command: signals connection close.
fn handle_cmd_quit(session: &Session) -> CommandResult {
    info!("Client {} requested to quit", session.peer());
    CommandResult::close(format_response(responses::GOODBYE, "Goodbye"))
}

fn handle_cmd_unknown(verb: &str) -> CommandResult {
    protocol_failure(ProtocolError::UnknownCommand(verb.to_string()))
}
