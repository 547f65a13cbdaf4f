//! Utility functions
//!
//! Logging setup and network helpers.

pub mod logging;
pub mod network;
