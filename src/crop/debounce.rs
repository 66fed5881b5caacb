use std::time::Duration;

use tokio::{sync::mpsc, task::JoinHandle};

/// Cancellable debounce timer.
///
/// Each [`Debouncer::schedule`] aborts the pending timer task (if any) and arms a
/// new one. A value is delivered through [`Debouncer::settled`] only once it has
/// survived a full quiet `window`.
///
/// Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    generation: u64,
    /// Values from generations at or below this were dropped by [`Debouncer::clear`].
    cleared_through: u64,
    pending: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<(u64, T)>,
    rx: mpsc::UnboundedReceiver<(u64, T)>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            window,
            generation: 0,
            cleared_through: 0,
            pending: None,
            tx,
            rx,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Replace any pending value with `value` and restart the quiet window.
    pub fn schedule(&mut self, value: T) {
        self.cancel();
        self.generation += 1;

        let generation = self.generation;
        let window = self.window;
        let tx = self.tx.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let _ = tx.send((generation, value));
        }));
    }

    /// Abort the pending timer. Values that already settled are kept.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Abort the pending timer and drop every value that has settled but not
    /// been taken yet.
    pub fn clear(&mut self) {
        self.cancel();
        self.cleared_through = self.generation;
        while self.rx.try_recv().is_ok() {}
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Next settled value, in settle order.
    ///
    /// Returns `None` immediately when nothing has settled and no timer is armed.
    pub async fn settled(&mut self) -> Option<T> {
        loop {
            let (generation, value) = match self.rx.try_recv() {
                Ok(item) => item,
                Err(_) if self.pending.is_none() => return None,
                Err(_) => self.rx.recv().await?,
            };
            if generation <= self.cleared_through {
                continue;
            }
            if generation == self.generation {
                self.pending = None;
            }
            return Some(value);
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
