//! File system storage management
//!
//! Handles file operations and directory listings.

pub mod listing;
pub mod operations;

pub use listing::list_directory;
