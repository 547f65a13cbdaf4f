//! Navigate module
//!
//! Handles working-directory changes for FTP sessions.

mod operations;

// Re-export public types and functions
pub use operations::change_directory;
