use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::Embedder;
use crate::error::{self, EvalError};

const RUNNING: u8 = 0;
const DONE: u8 = 1;
const ABANDONED: u8 = 2;

/// Runs each embedding call on a worker thread and gives up after `timeout`.
///
/// A call that misses its deadline keeps running in the background; its
/// result is dropped and the caller sees [`EvalError::EmbeddingTimeout`].
/// Until that abandoned call finishes, every new call fails immediately with
/// the same error instead of queueing behind it.
pub struct TimeoutEmbedder {
    inner: Arc<dyn Embedder>,
    timeout: Duration,
    abandoned: Arc<AtomicUsize>,
}

impl TimeoutEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, timeout: Duration) -> Self {
        Self {
            inner,
            timeout,
            abandoned: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Calls that timed out and are still running.
    pub fn stalled_calls(&self) -> usize {
        self.abandoned.load(Ordering::Acquire)
    }
}

impl Embedder for TimeoutEmbedder {
    fn embed(&self, texts: &[String]) -> error::Result<Vec<Vec<f32>>> {
        let stalled = self.stalled_calls();
        if stalled > 0 {
            return Err(EvalError::EmbeddingTimeout(format!(
                "{stalled} earlier embedding call(s) still running past the {:?} deadline",
                self.timeout
            )));
        }

        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let texts = texts.to_vec();
        let state = Arc::new(AtomicU8::new(RUNNING));
        let worker_state = Arc::clone(&state);
        let abandoned = Arc::clone(&self.abandoned);

        std::thread::Builder::new()
            .name("rageval-embed".into())
            .spawn(move || {
                let result = inner.embed(&texts);
                if worker_state.swap(DONE, Ordering::AcqRel) == ABANDONED {
                    abandoned.fetch_sub(1, Ordering::AcqRel);
                    debug!("abandoned embedding call finished");
                }
                // Receiver may be gone after a timeout.
                let _ = tx.send(result);
            })
            .map_err(|e| EvalError::EmbeddingService(format!("cannot spawn embed thread: {e}")))?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                // Count first so the worker's decrement never underflows.
                self.abandoned.fetch_add(1, Ordering::AcqRel);
                if state.swap(ABANDONED, Ordering::AcqRel) != RUNNING {
                    self.abandoned.fetch_sub(1, Ordering::AcqRel);
                }
                warn!(timeout = ?self.timeout, "embedding call timed out");
                Err(EvalError::EmbeddingTimeout(format!(
                    "embedding call timed out after {:?}",
                    self.timeout
                )))
            }
            Err(RecvTimeoutError::Disconnected) => Err(EvalError::EmbeddingService(
                "embedding worker exited without a result".into(),
            )),
        }
    }
}
