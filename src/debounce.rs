//! Trailing-edge debounce for fire-and-forget writes.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

pub const DEFAULT_WINDOW: Duration = Duration::from_millis(200);

/// Collapses bursts of calls into one action run with the latest value.
///
/// Every call arms a timer for `window`; a timer only fires its action when no
/// later call arrived in the meantime. A pending value is dropped if the
/// runtime shuts down before its window elapses.
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    seq: Arc<AtomicU64>,
    pending: Arc<Mutex<Option<T>>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seq: Arc::new(AtomicU64::new(0)),
            pending: Arc::new(Mutex::new(None)),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Schedule `action(value)` after the window, superseding any pending call.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn call<F, Fut>(&self, value: T, action: F)
    where
        F: FnOnce(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        *self.pending.lock() = Some(value);
        let ticket = self.seq.fetch_add(1, Ordering::SeqCst) + 1;

        let seq = Arc::clone(&self.seq);
        let pending = Arc::clone(&self.pending);
        let window = self.window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if seq.load(Ordering::SeqCst) != ticket {
                return;
            }
            let latest = pending.lock().take();
            let Some(value) = latest else {
                return;
            };
            action(value).await;
        });
    }
}

impl<T: Send + 'static> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}
