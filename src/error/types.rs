//! Error types
//!
//! Defines domain-specific error types for each module of the FTP server.
//! Everything except `FtpServerError` and `QueueError` is a per-command
//! failure: it becomes a reply line and the session carries on.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::protocol::responses;

/// Malformed or unsupported client input.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("command not supported: {0}")]
    UnknownCommand(String),

    #[error("{0} requires an argument")]
    MissingArgument(&'static str),

    #[error("invalid PORT argument: {0}")]
    InvalidPortArgument(String),

    #[error("unsupported transfer type: {0}")]
    UnsupportedType(String),
}

impl ProtocolError {
    pub fn ftp_code(&self) -> u16 {
        match self {
            ProtocolError::UnknownCommand(_) => responses::COMMAND_NOT_SUPPORTED,
            ProtocolError::MissingArgument(_) | ProtocolError::InvalidPortArgument(_) => {
                responses::SYNTAX_ERROR
            }
            ProtocolError::UnsupportedType(_) => responses::PARAMETER_NOT_IMPLEMENTED,
        }
    }
}

/// Storage module errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("failed to open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("failed to create directory {path}: {source}")]
    CreateDirectory { path: PathBuf, source: io::Error },

    #[error("failed to remove directory {path}: {source}")]
    RemoveDirectory { path: PathBuf, source: io::Error },

    #[error("failed to list directory {path}: {source}")]
    ReadDirectory { path: PathBuf, source: io::Error },
}

/// Navigate module errors
#[derive(Debug, Error)]
pub enum NavigateError {
    #[error("directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Failures while negotiating or opening a data connection.
#[derive(Debug, Error)]
pub enum DataChannelError {
    #[error("no data port negotiated; send PORT, PASV or EPSV first")]
    NotConfigured,

    #[error("failed to resolve {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        source: io::Error,
    },

    #[error("no usable address for {host}:{port}")]
    NoAddress { host: String, port: u16 },

    #[error("failed to connect to {addr}: {source}")]
    Connect { addr: SocketAddr, source: io::Error },

    #[error("failed to accept passive data connection: {0}")]
    Accept(io::Error),

    #[error("failed to open passive listener after {attempts} attempts: {source}")]
    Bind { attempts: usize, source: io::Error },

    #[error("no routable IPv4 address available for passive mode")]
    NoPassiveAddress,
}

impl DataChannelError {
    pub fn ftp_code(&self) -> u16 {
        responses::CANNOT_OPEN_DATA_CONNECTION
    }
}

/// Mid-copy failures in the transfer engine.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("read failed during transfer: {0}")]
    Read(io::Error),

    #[error("write failed during transfer: {0}")]
    Write(io::Error),
}

impl TransferError {
    pub fn ftp_code(&self) -> u16 {
        responses::LOCAL_PROCESSING_ERROR
    }
}

/// Job queue synchronisation failures. Never recoverable.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("job queue lock poisoned")]
    Poisoned,
}

/// Infrastructure errors that terminate the process.
#[derive(Debug, Error)]
pub enum FtpServerError {
    #[error("failed to bind control listener on {addr}: {source}")]
    Bind { addr: String, source: io::Error },

    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(io::Error),

    #[error("job queue failure: {0}")]
    Queue(#[from] QueueError),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_errors_map_to_reply_codes() {
        assert_eq!(ProtocolError::UnknownCommand("FOO".into()).ftp_code(), 500);
        assert_eq!(ProtocolError::MissingArgument("RETR").ftp_code(), 501);
        assert_eq!(ProtocolError::UnsupportedType("E".into()).ftp_code(), 504);
        assert_eq!(DataChannelError::NotConfigured.ftp_code(), 425);
        let err = TransferError::Write(io::Error::from(io::ErrorKind::BrokenPipe));
        assert_eq!(err.ftp_code(), 451);
    }
}
