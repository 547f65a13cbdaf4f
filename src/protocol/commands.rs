//! Module `command`
//!
//! Defines the FTP command set understood by the server, the outcome of
//! running a command, and the parser that turns a control line into a
//! `Command`.

use crate::error::ProtocolError;

/// Represents an FTP command parsed from the client input.
///
/// Verbs are matched case-sensitively, exactly as sent. Commands that take
/// arguments carry the raw remainder of the line; each handler tokenizes its
/// own arguments.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    User(String),
    Pass(String),
    Syst,
    Feat,
    Pwd,
    Type(String),
    Cwd(String),
    Port(String),
    Pasv,
    Epsv,
    List,
    Retr(String),
    Stor(String),
    Appe(String),
    Rmd(String),
    Mkd(String),
    Quit,
    /// Any verb outside the supported set.
    Unknown(String),
}

impl Command {
    /// Name of the verb, for logging.
    pub fn verb(&self) -> &str {
        match self {
            Command::User(_) => "USER",
            Command::Pass(_) => "PASS",
            Command::Syst => "SYST",
            Command::Feat => "FEAT",
            Command::Pwd => "PWD",
            Command::Type(_) => "TYPE",
            Command::Cwd(_) => "CWD",
            Command::Port(_) => "PORT",
            Command::Pasv => "PASV",
            Command::Epsv => "EPSV",
            Command::List => "LIST",
            Command::Retr(_) => "RETR",
            Command::Stor(_) => "STOR",
            Command::Appe(_) => "APPE",
            Command::Rmd(_) => "RMD",
            Command::Mkd(_) => "MKD",
            Command::Quit => "QUIT",
            Command::Unknown(verb) => verb,
        }
    }
}

/// Represents the outcome status of executing a command.
#[derive(Debug, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    Failure(String),
    CloseConnection,
}

/// Struct encapsulating the full result of a command execution.
#[derive(Debug)]
pub struct CommandResult {
    pub status: CommandStatus,
    pub message: Option<String>,
}

impl CommandResult {
    pub fn success(message: String) -> Self {
        Self {
            status: CommandStatus::Success,
            message: Some(message),
        }
    }

    pub fn failure(reason: impl Into<String>, message: String) -> Self {
        Self {
            status: CommandStatus::Failure(reason.into()),
            message: Some(message),
        }
    }

    pub fn close(message: String) -> Self {
        Self {
            status: CommandStatus::CloseConnection,
            message: Some(message),
        }
    }
}

/// Parses a control line (already stripped of its CR/LF terminator) into a
/// `Command`.
///
/// The first whitespace-delimited token is the verb; everything after the
/// separating whitespace is passed through untouched as the argument string.
pub fn parse_command(line: &str) -> Command {
    let line = line.trim_start();
    let (verb, rest) = match line.find(char::is_whitespace) {
        Some(idx) => (&line[..idx], line[idx..].trim_start()),
        None => (line, ""),
    };
    let arg = rest.to_string();

    match verb {
        "USER" => Command::User(arg),
        "PASS" => Command::Pass(arg),
        "SYST" => Command::Syst,
        "FEAT" => Command::Feat,
        "PWD" => Command::Pwd,
        "TYPE" => Command::Type(arg),
        "CWD" => Command::Cwd(arg),
        "PORT" => Command::Port(arg),
        "PASV" => Command::Pasv,
        "EPSV" => Command::Epsv,
        "LIST" => Command::List,
        "RETR" => Command::Retr(arg),
        "STOR" => Command::Stor(arg),
        "APPE" => Command::Appe(arg),
        "RMD" => Command::Rmd(arg),
        "MKD" => Command::Mkd(arg),
        "QUIT" => Command::Quit,
        other => Command::Unknown(other.to_string()),
    }
}

/// First space-separated token of an argument string.
pub fn first_argument<'a>(args: &'a str, verb: &'static str) -> Result<&'a str, ProtocolError> {
    args.split(' ')
        .find(|token| !token.is_empty())
        .ok_or(ProtocolError::MissingArgument(verb))
}
