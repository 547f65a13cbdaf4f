use log::{debug, error, info, warn};
use std::future::Future;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::client::handle_client;
use crate::error::FtpServerError;
use crate::server::config::ServerConfig;
use crate::server::pool::WorkerPool;
use crate::server::queue::{Job, JobQueue};
use crate::utils::network::open_listener;

pub struct Server {
    listener: TcpListener,
    queue: Arc<JobQueue<Job>>,
    pool: WorkerPool,
    config: Arc<ServerConfig>,
}

impl Server {
    /// Binds the control listener and starts the worker pool.
    pub async fn bind(config: ServerConfig) -> Result<Self, FtpServerError> {
        let config = Arc::new(config);
        let control_socket = config.control_socket();

        let addr = resolve_bind_address(&control_socket)?;
        let std_listener = open_listener(addr, config.listen_backlog)
            .and_then(|listener| {
                listener.set_nonblocking(true)?;
                Ok(listener)
            })
            .map_err(|source| FtpServerError::Bind {
                addr: control_socket.clone(),
                source,
            })?;
        let listener = TcpListener::from_std(std_listener).map_err(|source| FtpServerError::Bind {
            addr: control_socket.clone(),
            source,
        })?;
        info!("Server bound to {}", listener.local_addr()?);

        let root = config.root_dir_path();
        match root.canonicalize() {
            Ok(root) => info!("Server root directory: {}", root.display()),
            Err(e) => warn!("Root directory {} is not accessible: {}", root.display(), e),
        }

        let queue = Arc::new(JobQueue::new());
        let handler_config = Arc::clone(&config);
        let pool = WorkerPool::spawn(config.worker_threads, Arc::clone(&queue), move |job| {
            handle_client(job, Arc::clone(&handler_config))
        })?;

        Ok(Self {
            listener,
            queue,
            pool,
            config,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, FtpServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections and queues them for the workers until `shutdown`
    /// resolves. Follow with [`Server::drain`] to let running sessions end.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<(), FtpServerError>
    where
        F: Future<Output = ()>,
    {
        info!(
            "Starting FTP server on {} ({} workers)",
            self.config.control_socket(),
            self.pool.size()
        );
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let stream = match stream.into_std().and_then(|s| {
                            s.set_nonblocking(false)?;
                            Ok(s)
                        }) {
                            Ok(stream) => stream,
                            Err(e) => {
                                warn!("Failed to hand off connection from {}: {}", peer, e);
                                continue;
                            }
                        };
                        self.queue.enqueue(Job::new(stream, peer))?;
                        debug!("Queued connection from {} ({} waiting)", peer, self.queue.len()?);
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                    }
                },
            }
        }
    }

    /// Closes the control listener and waits until every session that has
    /// already started runs to completion. Connections still queued are
    /// dropped unserved.
    pub async fn drain(self) -> Result<(), FtpServerError> {
        let Server {
            listener,
            queue,
            pool,
            ..
        } = self;
        drop(listener);

        if !queue.is_empty()? {
            warn!("{} queued connection(s) will not be served", queue.len()?);
        }
        info!("Waiting for {} running session(s)", pool.running()?);

        tokio::task::spawn_blocking(move || pool.drain()).await?
    }
}

fn resolve_bind_address(control_socket: &str) -> Result<SocketAddr, FtpServerError> {
    let mut addrs = control_socket
        .to_socket_addrs()
        .map_err(|source| FtpServerError::Bind {
            addr: control_socket.to_string(),
            source,
        })?;
    addrs.next().ok_or_else(|| FtpServerError::Bind {
        addr: control_socket.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::AddrNotAvailable, "no address resolved"),
    })
}
