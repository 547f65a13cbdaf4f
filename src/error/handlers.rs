//! Error handlers
//!
//! Infrastructure faults end the process; everything else is answered on the
//! control connection by the command handlers.

use crate::error::types::FtpServerError;
use log::error;

/// Log an infrastructure fault and terminate the process.
pub fn fatal(err: &FtpServerError) -> ! {
    error!("Fatal server error: {}", err);
    std::process::exit(1);
}
