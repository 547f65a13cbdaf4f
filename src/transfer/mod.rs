//! Transfer module for FTP server
//!
//! Handles data channel negotiation and the transfer engine that moves
//! bytes between files and data connections.

pub mod data_channel;
pub mod file_ops;
pub mod modes;

// Re-export key types and functions
pub use data_channel::{PassiveListener, connect_active};
pub use file_ops::transfer;
pub use modes::{DataChannel, TransferMode, TransferType};
