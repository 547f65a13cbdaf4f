//! FTP Transfer modes
//!
//! Transfer type (how bytes are rewritten) and transfer mode (who opens the
//! data connection) are independent axes of the session state.

use crate::error::ProtocolError;
use crate::transfer::data_channel::PassiveListener;

/// Representation type negotiated with TYPE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferType {
    /// Lines are rewritten with CRLF terminators in both directions.
    #[default]
    Ascii,
    /// Bytes are copied unchanged.
    Binary,
}

impl TransferType {
    /// Parses the type code of a TYPE argument (`A` or `I`).
    pub fn from_type_code(code: &str) -> Result<Self, ProtocolError> {
        match code {
            "A" => Ok(TransferType::Ascii),
            "I" => Ok(TransferType::Binary),
            other => Err(ProtocolError::UnsupportedType(other.to_string())),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransferType::Ascii => "ASCII",
            TransferType::Binary => "BINARY",
        }
    }
}

/// FTP transfer modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Active,
    Passive,
}

/// Data-connection setup negotiated by PORT / PASV / EPSV.
#[derive(Debug)]
pub enum DataChannel {
    /// Server connects back to the control peer on the port given by PORT.
    Active(Option<u16>),
    /// Server accepts on its own listener. The listener serves one transfer.
    Passive(Option<PassiveListener>),
}

impl Default for DataChannel {
    fn default() -> Self {
        DataChannel::Active(None)
    }
}

impl DataChannel {
    pub fn mode(&self) -> TransferMode {
        match self {
            DataChannel::Active(_) => TransferMode::Active,
            DataChannel::Passive(_) => TransferMode::Passive,
        }
    }
}
