//! Fixed-size request thread pool.
//!
//! Request-per-thread scheduling on top of a worker pool sized at startup
//! (`Config::thread_pool_size`, default `num_cpus::get()`). Within one
//! request, evaluation is single-threaded and synchronous — the pool only
//! decides which worker runs a request, never parallelizes inside it.
//! Jobs queue on a `crossbeam-channel` MPMC channel rather than a
//! condvar-guarded `VecDeque`, since every worker can pull directly from
//! the same receiver without a dispatcher thread.

use crossbeam_channel::{bounded, Sender};
use log::warn;

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct ThreadPool {
    sender: Option<Sender<Job>>,
    workers: Vec<std::thread::JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawn `size` worker threads (minimum 1) sharing one job queue.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let (sender, receiver) = bounded::<Job>(size * 4);
        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let receiver = receiver.clone();
            workers.push(std::thread::spawn(move || {
                while let Ok(job) = receiver.recv() {
                    job();
                }
                let _ = id; // kept for future per-worker diagnostics
            }));
        }
        Self { sender: Some(sender), workers }
    }

    /// Queue a request for execution on the next available worker.
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Some(sender) = &self.sender {
            if sender.send(Box::new(job)).is_err() {
                warn!("thread pool queue closed, dropping job");
            }
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        // Dropping the sender closes the channel, so every worker's `recv`
        // loop exits once the queue drains.
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn runs_queued_jobs_across_workers() {
        let pool = ThreadPool::new(4);
        assert_eq!(pool.worker_count(), 4);

        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..50 {
            let counter = counter.clone();
            pool.execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        drop(pool); // joins every worker, so all jobs have completed by here
        assert_eq!(counter.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn zero_size_request_clamps_to_one_worker() {
        let pool = ThreadPool::new(0);
        assert_eq!(pool.worker_count(), 1);
    }
}
