//! Fixed-size worker pool fed by a bounded queue.

use std::io;
use std::sync::mpsc::{self, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

/// Jobs are handed to `workers` threads through a queue holding at most
/// `capacity` pending jobs. [`BoundedQueue::submit`] blocks while the queue
/// is full, which is the backpressure policy for producers.
pub struct BoundedQueue<T: Send + 'static> {
    sender: Option<SyncSender<T>>,
    workers: Vec<JoinHandle<()>>,
}

impl<T: Send + 'static> BoundedQueue<T> {
    /// Spawn the workers. `make_handler` is called once per worker, so each
    /// handler can own per-thread state such as a database connection.
    pub fn start<F, H>(
        name: &str,
        workers: usize,
        capacity: usize,
        mut make_handler: F,
    ) -> io::Result<Self>
    where
        F: FnMut() -> H,
        H: FnMut(T) + Send + 'static,
    {
        let (sender, receiver) = mpsc::sync_channel::<T>(capacity);
        let receiver = Arc::new(Mutex::new(receiver));

        let mut handles = Vec::with_capacity(workers);
        for i in 0..workers.max(1) {
            let receiver = Arc::clone(&receiver);
            let mut handler = make_handler();
            let handle = thread::Builder::new().name(format!("{name}-{i}")).spawn(move || {
                loop {
                    let job = receiver.lock().unwrap_or_else(PoisonError::into_inner).recv();
                    match job {
                        Ok(job) => handler(job),
                        Err(_) => break,
                    }
                }
            })?;
            handles.push(handle);
        }

        Ok(Self { sender: Some(sender), workers: handles })
    }

    /// Queue a job, blocking while the queue is full.
    /// Returns `false` once the queue has been shut down.
    pub fn submit(&self, job: T) -> bool {
        match &self.sender {
            Some(sender) => sender.send(job).is_ok(),
            None => false,
        }
    }

    /// Stop accepting jobs, drain what is queued and join the workers.
    pub fn shutdown(&mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("Index worker panicked");
            }
        }
    }
}

impl<T: Send + 'static> Drop for BoundedQueue<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
