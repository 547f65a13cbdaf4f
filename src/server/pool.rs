//! Worker pool
//!
//! A fixed set of OS threads, each looping forever: take the next job from
//! the shared queue and run it to completion. The pool counts the sessions
//! in progress so shutdown can wait for them.

use log::{debug, info, warn};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crate::error::{FtpServerError, QueueError, fatal};
use crate::server::queue::JobQueue;

#[derive(Debug, Default)]
struct Activity {
    running: usize,
    draining: bool,
}

/// Sessions currently running on the workers.
#[derive(Debug, Default)]
struct ActiveSessions {
    activity: Mutex<Activity>,
    idle: Condvar,
}

impl ActiveSessions {
    /// Registers a job about to run. Returns `None` once draining has begun.
    fn begin(self: &Arc<Self>) -> Result<Option<RunningGuard>, QueueError> {
        let mut activity = self.activity.lock().map_err(|_| QueueError::Poisoned)?;
        if activity.draining {
            return Ok(None);
        }
        activity.running += 1;
        Ok(Some(RunningGuard {
            sessions: Arc::clone(self),
        }))
    }

    fn drain(&self) -> Result<(), QueueError> {
        let mut activity = self.activity.lock().map_err(|_| QueueError::Poisoned)?;
        activity.draining = true;
        while activity.running > 0 {
            info!("Waiting for {} session(s) to finish", activity.running);
            activity = self.idle.wait(activity).map_err(|_| QueueError::Poisoned)?;
        }
        Ok(())
    }

    fn running(&self) -> Result<usize, QueueError> {
        Ok(self.activity.lock().map_err(|_| QueueError::Poisoned)?.running)
    }
}

/// Decrements the running count when a job finishes, even by panic.
struct RunningGuard {
    sessions: Arc<ActiveSessions>,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        match self.sessions.activity.lock() {
            Ok(mut activity) => activity.running -= 1,
            Err(_) => fatal(&FtpServerError::Queue(QueueError::Poisoned)),
        }
        self.sessions.idle.notify_all();
    }
}

/// Handle to the running worker threads.
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
    sessions: Arc<ActiveSessions>,
}

impl WorkerPool {
    /// Spawns `size` workers that feed jobs from `queue` into `handler`.
    ///
    /// A poisoned queue is an infrastructure failure and terminates the
    /// process.
    pub fn spawn<T, F>(
        size: usize,
        queue: Arc<JobQueue<T>>,
        handler: F,
    ) -> Result<Self, FtpServerError>
    where
        T: Send + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        let sessions = Arc::new(ActiveSessions::default());
        let mut workers = Vec::with_capacity(size);

        for id in 0..size {
            let queue = Arc::clone(&queue);
            let handler = Arc::clone(&handler);
            let sessions = Arc::clone(&sessions);
            let worker = thread::Builder::new()
                .name(format!("ftp-worker-{id}"))
                .spawn(move || {
                    debug!("Worker {} started", id);
                    loop {
                        let job = match queue.dequeue() {
                            Ok(job) => job,
                            Err(e) => fatal(&FtpServerError::Queue(e)),
                        };
                        match sessions.begin() {
                            Ok(Some(_running)) => handler(job),
                            Ok(None) => warn!("Worker {} dropped a job while draining", id),
                            Err(e) => fatal(&FtpServerError::Queue(e)),
                        }
                    }
                })
                .map_err(FtpServerError::WorkerSpawn)?;
            workers.push(worker);
        }

        info!("Worker pool running with {} threads", size);
        Ok(Self { workers, sessions })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Number of jobs currently being handled.
    pub fn running(&self) -> Result<usize, FtpServerError> {
        Ok(self.sessions.running()?)
    }

    /// Stops starting new jobs and blocks until every running job has
    /// returned. Jobs still queued are never started.
    pub fn drain(&self) -> Result<(), FtpServerError> {
        self.sessions.drain()?;
        info!("Worker pool drained");
        Ok(())
    }
}
