//! Job queue
//!
//! FIFO hand-off of accepted control connections from the acceptor to the
//! worker pool. One mutex guards the queue and one condition variable wakes
//! workers waiting for a job.

use std::collections::VecDeque;
use std::net::{SocketAddr, TcpStream};
use std::sync::{Condvar, Mutex};

use crate::error::QueueError;

/// An accepted control connection waiting for a worker.
#[derive(Debug)]
pub struct Job {
    pub stream: TcpStream,
    pub peer: SocketAddr,
}

impl Job {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self { stream, peer }
    }
}

/// Blocking multi-producer, multi-consumer FIFO queue.
#[derive(Debug)]
pub struct JobQueue<T = Job> {
    jobs: Mutex<VecDeque<T>>,
    available: Condvar,
}

impl<T> Default for JobQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> JobQueue<T> {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
        }
    }

    /// Appends a job to the tail and wakes one waiting worker.
    pub fn enqueue(&self, job: T) -> Result<(), QueueError> {
        let mut jobs = self.jobs.lock().map_err(|_| QueueError::Poisoned)?;
        jobs.push_back(job);
        drop(jobs);
        self.available.notify_one();
        Ok(())
    }

    /// Removes the head job, blocking while the queue is empty.
    pub fn dequeue(&self) -> Result<T, QueueError> {
        let mut jobs = self.jobs.lock().map_err(|_| QueueError::Poisoned)?;
        loop {
            if let Some(job) = jobs.pop_front() {
                return Ok(job);
            }
            // Spurious wakeups land back here and re-check the queue.
            jobs = self.available.wait(jobs).map_err(|_| QueueError::Poisoned)?;
        }
    }

    /// Number of queued jobs.
    pub fn len(&self) -> Result<usize, QueueError> {
        Ok(self.jobs.lock().map_err(|_| QueueError::Poisoned)?.len())
    }

    pub fn is_empty(&self) -> Result<bool, QueueError> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn single_thread_order_is_fifo() {
        let queue = JobQueue::new();
        for i in 0..10 {
            queue.enqueue(i).unwrap();
        }
        let drained: Vec<i32> = (0..10).map(|_| queue.dequeue().unwrap()).collect();
        assert_eq!(drained, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn count_tracks_queued_jobs() {
        let queue = JobQueue::new();
        assert!(queue.is_empty().unwrap());
        queue.enqueue("a").unwrap();
        queue.enqueue("b").unwrap();
        assert_eq!(queue.len().unwrap(), 2);
        queue.dequeue().unwrap();
        assert_eq!(queue.len().unwrap(), 1);
        queue.dequeue().unwrap();
        assert!(queue.is_empty().unwrap());
    }

    #[test]
    fn dequeue_blocks_until_a_job_arrives() {
        let queue = Arc::new(JobQueue::new());
        let (tx, rx) = mpsc::channel();

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || tx.send(queue.dequeue().unwrap()).unwrap())
        };

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        queue.enqueue(42).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
        consumer.join().unwrap();
    }

    #[test]
    fn concurrent_consumers_take_jobs_in_enqueue_order() {
        const JOBS: usize = 2000;
        let queue = Arc::new(JobQueue::new());
        // Each dequeue and the record of its result happen under one lock,
        // so the log order is the dequeue order.
        let log = Arc::new(Mutex::new(Vec::with_capacity(JOBS)));
        let turnstile = Arc::new(Mutex::new(()));

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let log = Arc::clone(&log);
                let turnstile = Arc::clone(&turnstile);
                thread::spawn(move || {
                    loop {
                        let _turn = turnstile.lock().unwrap();
                        let job = queue.dequeue().unwrap();
                        if job == usize::MAX {
                            return;
                        }
                        log.lock().unwrap().push(job);
                    }
                })
            })
            .collect();

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..JOBS {
                    queue.enqueue(i).unwrap();
                }
                for _ in 0..4 {
                    queue.enqueue(usize::MAX).unwrap();
                }
            })
        };

        producer.join().unwrap();
        for consumer in consumers {
            consumer.join().unwrap();
        }

        let log = log.lock().unwrap();
        assert_eq!(*log, (0..JOBS).collect::<Vec<_>>());
        assert!(queue.is_empty().unwrap());
    }

    #[test]
    fn poisoned_lock_is_reported() {
        let queue = Arc::new(JobQueue::<u8>::new());
        let poisoner = Arc::clone(&queue);
        let _ = thread::spawn(move || {
            let _guard = poisoner.jobs.lock().unwrap();
            panic!("poison the queue");
        })
        .join();

        assert!(matches!(queue.enqueue(1), Err(QueueError::Poisoned)));
        assert!(matches!(queue.dequeue(), Err(QueueError::Poisoned)));
    }
}
