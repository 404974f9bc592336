//! The per-media download slot: a mutex-guarded target/buffer pair plus the
//! two counting signals that hand requests to the worker and completions
//! back to the caller.
//!
//! This models §5's "parallel threads with per-media slots": each
//! [`DownloadSlot`] has its own mutex, there is no global lock, and the
//! caller never touches `target`/`buffer` except through the methods here.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{Mutex, Notify, mpsc};

#[derive(Debug, Default)]
struct SlotState {
    target: Option<String>,
    buffer: Option<Bytes>,
    cookies: String,
    abort: bool,
    run: bool,
}

/// One media's download slot.
///
/// Invariant (§3): `buffer == null ∨ target == null` holds at rest, except
/// during the single critical section where the worker publishes a result.
/// At most one request may be in flight; [`DownloadSlot::queue`] must not be
/// called again until the prior request's completion has been observed via
/// [`DownloadSlot::wait_for_result`] or [`DownloadSlot::abort_and_wait`].
#[derive(Debug)]
pub(crate) struct DownloadSlot {
    state: Mutex<SlotState>,
    to_worker: mpsc::Sender<()>,
    to_caller: Notify,
}

impl DownloadSlot {
    /// Creates a slot and the worker's half of the request signal.
    pub(crate) fn new() -> (Arc<Self>, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel(1);
        let slot = Arc::new(Self {
            state: Mutex::new(SlotState {
                run: true,
                ..SlotState::default()
            }),
            to_worker: tx,
            to_caller: Notify::new(),
        });
        (slot, rx)
    }

    /// Publishes a new target URL and wakes the worker.
    pub(crate) async fn queue(&self, url: String) {
        let mut state = self.state.lock().await;
        state.target = Some(url.clone());
        state.abort = false;
        drop(state);
        tracing::trace!(url = %url, "queuing fragment download");
        let _ = self.to_worker.send(()).await;
    }

    /// Requests cancellation of the in-flight download and waits for the
    /// worker to acknowledge it, discarding whatever it was fetching.
    pub(crate) async fn abort_and_wait(&self) {
        {
            let mut state = self.state.lock().await;
            state.abort = true;
        }
        self.to_caller.notified().await;
    }

    /// Waits for the worker's current request to complete and takes the
    /// published buffer, or `None` if the request failed or was aborted.
    pub(crate) async fn wait_for_result(&self) -> Option<Bytes> {
        self.to_caller.notified().await;
        let mut state = self.state.lock().await;
        state.buffer.take()
    }

    /// Stops the worker loop: clears `run`, forces an abort of any in-flight
    /// request, and wakes the worker so it observes both and exits.
    pub(crate) async fn stop(&self) {
        let mut state = self.state.lock().await;
        state.run = false;
        state.abort = true;
        drop(state);
        let _ = self.to_worker.send(()).await;
    }

    pub(crate) async fn is_aborted(&self) -> bool {
        self.state.lock().await.abort
    }

    /// Snapshots `(run, target, cookies)` and clears `abort` under the
    /// mutex, per §4.6 step 2. The worker never reads these fields again
    /// outside a critical section; it works from this snapshot until the
    /// request completes.
    pub(crate) async fn snapshot_for_worker(&self) -> (bool, Option<String>, String) {
        let mut state = self.state.lock().await;
        state.abort = false;
        state.buffer = None;
        (state.run, state.target.clone(), state.cookies.clone())
    }

    /// Publishes the outcome of a completed (or aborted) request under the
    /// mutex. Cookies are replaced only if the new jar is non-empty (§3).
    pub(crate) async fn publish_result(&self, outcome: Option<(Bytes, String)>) {
        let mut state = self.state.lock().await;
        if state.abort {
            state.abort = false;
            state.buffer = None;
        } else if let Some((body, cookies)) = outcome {
            if !cookies.is_empty() {
                state.cookies = cookies;
            }
            state.buffer = Some(body);
        } else {
            state.buffer = None;
        }
    }

    pub(crate) fn notify_caller(&self) {
        self.to_caller.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queue_then_stop_wakes_worker_once_each() {
        let (slot, mut rx) = DownloadSlot::new();
        slot.queue("http://example.com/a".to_string()).await;
        assert!(rx.recv().await.is_some());

        slot.stop().await;
        assert!(rx.recv().await.is_some());

        let (run, target, _) = slot.snapshot_for_worker().await;
        assert!(!run);
        assert_eq!(target.as_deref(), Some("http://example.com/a"));
    }

    #[tokio::test]
    async fn publish_result_is_dropped_when_aborted() {
        let (slot, _rx) = DownloadSlot::new();
        slot.queue("http://example.com/a".to_string()).await;
        slot.abort_and_wait_test_hook().await;
        slot.publish_result(Some((Bytes::from_static(b"data"), String::new()))).await;
        slot.notify_caller();
        assert_eq!(slot.wait_for_result().await, None);
    }

    impl DownloadSlot {
        async fn abort_and_wait_test_hook(&self) {
            let mut state = self.state.lock().await;
            state.abort = true;
        }
    }

    #[tokio::test]
    async fn cookies_replace_only_when_non_empty() {
        let (slot, _rx) = DownloadSlot::new();
        slot.publish_result(Some((Bytes::from_static(b"a"), "session=1".to_string())))
            .await;
        assert_eq!(slot.state.lock().await.cookies, "session=1");

        slot.publish_result(Some((Bytes::from_static(b"b"), String::new()))).await;
        assert_eq!(slot.state.lock().await.cookies, "session=1");
    }
}
