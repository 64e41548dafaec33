//! Trailing-edge debounce over a stream of values.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Quiet period after the last edit before a save is considered.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1500);

/// Coalesces bursts of values into a single trailing emission.
///
/// Every `push` restarts the quiet period; only the last value of a burst
/// reaches the receiver returned by [`Debouncer::new`]. The timer task is
/// owned by the debouncer and aborted when it is dropped, so nothing is
/// emitted after teardown.
pub struct Debouncer<T> {
    input: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Must be called from within a tokio runtime.
    pub fn new(window: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (input, mut rx) = mpsc::unbounded_channel::<T>();
        let (output, out_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            let mut pending: Option<T> = None;
            let timer = tokio::time::sleep(window);
            tokio::pin!(timer);

            loop {
                tokio::select! {
                    value = rx.recv() => match value {
                        Some(value) => {
                            trace!("debounce timer restarted");
                            pending = Some(value);
                            timer.as_mut().reset(Instant::now() + window);
                        }
                        // Owner gone; a pending value is dropped, not flushed.
                        None => break,
                    },
                    _ = &mut timer, if pending.is_some() => {
                        if let Some(value) = pending.take() {
                            if output.send(value).is_err() {
                                break;
                            }
                        }
                    }
                }
            }
            debug!("debouncer stopped");
        });

        (Self { input, task }, out_rx)
    }

    pub fn push(&self, value: T) {
        if self.input.send(value).is_err() {
            debug!("debouncer task already stopped; value dropped");
        }
    }
}

impl<T> Debouncer<T> {
    /// Stops the timer. A pending value is discarded.
    pub fn cancel(self) {}
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, timeout};

    #[tokio::test(start_paused = true)]
    async fn test_burst_emits_last_value_once() {
        let start = Instant::now();
        let (debouncer, mut out) = Debouncer::new(Duration::from_millis(1500));

        debouncer.push(0);
        sleep(Duration::from_millis(100)).await;
        debouncer.push(100);
        sleep(Duration::from_millis(200)).await;
        debouncer.push(300);
        sleep(Duration::from_millis(700)).await;
        debouncer.push(1000);

        let value = out.recv().await.unwrap();
        let elapsed = start.elapsed();
        assert_eq!(value, 1000);
        assert!(elapsed >= Duration::from_millis(2500), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(2510), "{elapsed:?}");

        assert!(timeout(Duration::from_secs(10), out.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_emit_separately() {
        let (debouncer, mut out) = Debouncer::new(DEFAULT_DEBOUNCE);

        debouncer.push("a");
        assert_eq!(out.recv().await, Some("a"));

        debouncer.push("b");
        debouncer.push("c");
        assert_eq!(out.recv().await, Some("c"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_emission() {
        let (debouncer, mut out) = Debouncer::new(DEFAULT_DEBOUNCE);
        debouncer.push(1);
        sleep(Duration::from_millis(500)).await;
        debouncer.cancel();

        // The timer task is gone, so the channel closes without a value.
        assert_eq!(out.recv().await, None);
    }
}
