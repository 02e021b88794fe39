use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("another operation is in progress")]
    Busy,
    #[error("failed to start worker thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Runs at most one background job at a time.
#[derive(Debug, Clone, Default)]
pub struct Worker {
    busy: Arc<AtomicBool>,
}

/// Clears the in-flight flag when dropped, including on panic.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Worker {
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Starts `job` on a background thread unless one is already running.
    ///
    /// The flag is cleared before `on_done` receives the job's result, so a
    /// completion message observed by the UI always finds the worker idle.
    pub fn try_spawn<T, J, D>(&self, job: J, on_done: D) -> Result<JoinHandle<()>, WorkerError>
    where
        J: FnOnce() -> T + Send + 'static,
        D: FnOnce(T) + Send + 'static,
        T: 'static,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(WorkerError::Busy);
        }

        let guard = BusyGuard(Arc::clone(&self.busy));
        let handle = thread::Builder::new()
            .name("dent-remote-worker".to_string())
            .spawn(move || {
                let result = job();
                drop(guard);
                on_done(result);
            })?;

        Ok(handle)
    }
}
