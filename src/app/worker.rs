use std::sync::mpsc;
use std::thread;

/// Result of a job running on its own thread, published back by polling.
#[derive(Debug)]
pub struct WorkerTask<T> {
    rx: mpsc::Receiver<T>,
    label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPoll<T> {
    Pending,
    Ready(T),
    /// The worker thread ended without sending a result.
    Lost,
}

impl<T: Send + 'static> WorkerTask<T> {
    pub fn spawn<W>(label: &'static str, work: W) -> Self
    where
        W: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<T>();
        thread::spawn(move || {
            let result = work();
            let _ = tx.send(result);
        });
        tracing::debug!(label, "worker spawned");
        Self { rx, label }
    }

    pub fn poll(&self) -> WorkerPoll<T> {
        match self.rx.try_recv() {
            Ok(result) => WorkerPoll::Ready(result),
            Err(mpsc::TryRecvError::Empty) => WorkerPoll::Pending,
            Err(mpsc::TryRecvError::Disconnected) => {
                tracing::warn!(label = self.label, "worker exited without a result");
                WorkerPoll::Lost
            }
        }
    }

    /// Blocks until the worker finishes. `None` when it died first.
    pub fn wait(self) -> Option<T> {
        self.rx.recv().ok()
    }
}
