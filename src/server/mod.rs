//! Server core functionality
//!
//! This module contains the connection acceptor, configuration, the job
//! queue and the worker pool that runs client sessions.

pub mod config;
pub mod core;
pub mod pool;
pub mod queue;

pub use self::core::Server;
pub use config::ServerConfig;
pub use pool::WorkerPool;
pub use queue::{Job, JobQueue};
