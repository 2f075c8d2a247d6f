//! Oracle plumbing shared by the enhancement stages.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::traits::TextOracle;

/// Bounds every `complete` call of the wrapped oracle by `timeout`.
///
/// The call runs on a detached worker thread; on timeout the caller gets
/// `Error::Oracle` immediately and the late answer is dropped.
pub struct TimeoutOracle {
    inner: Arc<dyn TextOracle>,
    timeout: Duration,
}

impl TimeoutOracle {
    pub fn new(inner: Arc<dyn TextOracle>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl TextOracle for TimeoutOracle {
    fn complete(&self, prompt: &str) -> Result<String> {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let prompt = prompt.to_string();
        thread::Builder::new()
            .name("oracle-call".into())
            .spawn(move || {
                let _ = tx.send(inner.complete(&prompt));
            })
            .map_err(|e| Error::Oracle(format!("failed to spawn oracle worker: {e}")))?;
        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                Err(Error::Oracle(format!("timed out after {:?}", self.timeout)))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Error::Oracle("oracle worker panicked".into())),
        }
    }
}

/// Oracle backed by a closure; handy for tests and in-process models.
pub struct FnOracle<F>(pub F);

impl<F> TextOracle for FnOracle<F>
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    fn complete(&self, prompt: &str) -> Result<String> {
        (self.0)(prompt)
    }
}
