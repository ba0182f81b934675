//! Bounded FIFO concurrency limiter.
//!
//! Admits at most `concurrency` operations at a time. Admission is decided
//! when [`ConcurrencyLimiter::submit`] is *called*, not when the returned
//! future is first polled, so queued operations start in submission order
//! regardless of how the caller drives the futures.
//!
//! A slot is released when the admitted operation finishes, fails, unwinds
//! or is dropped. Released slots are handed directly to the oldest live
//! waiter; waiters whose futures were dropped are skipped.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LimiterError {
    #[error("Concurrency limit must be at least 1")]
    ZeroConcurrency,
}

#[derive(Debug, Default)]
struct LimiterState {
    running: usize,
    waiters: VecDeque<oneshot::Sender<Slot>>,
}

#[derive(Debug)]
struct Inner {
    concurrency: usize,
    state: Mutex<LimiterState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        // Critical sections never run user code, so a poisoned lock still
        // holds consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(self: &Arc<Self>) {
        let mut state = self.lock();
        while let Some(waiter) = state.waiters.pop_front() {
            match waiter.send(Slot::handoff(Arc::clone(self))) {
                Ok(()) => return,
                Err(mut orphan) => {
                    // Waiter went away before admission.
                    orphan.disarm();
                }
            }
        }
        state.running = state.running.saturating_sub(1);
    }
}

/// Ownership of one concurrency slot. Dropping it frees the slot.
#[derive(Debug)]
struct Slot {
    inner: Option<Arc<Inner>>,
}

impl Slot {
    fn handoff(inner: Arc<Inner>) -> Self {
        Self { inner: Some(inner) }
    }

    fn disarm(&mut self) {
        self.inner = None;
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            inner.release();
        }
    }
}

enum Admission {
    Ready(Slot),
    Queued {
        receiver: oneshot::Receiver<Slot>,
        inner: Arc<Inner>,
    },
}

impl Admission {
    async fn wait(self) -> Slot {
        match self {
            Self::Ready(slot) => slot,
            Self::Queued { receiver, inner } => match receiver.await {
                Ok(slot) => slot,
                // Senders live in the limiter state, which `inner` keeps
                // alive; claim directly if one is ever dropped unsent.
                Err(_) => {
                    inner.lock().running += 1;
                    Slot::handoff(inner)
                }
            },
        }
    }
}

/// General-purpose bounded concurrency gate with FIFO admission.
///
/// Cloning shares the same slots.
///
/// # Examples
///
/// ```no_run
/// use taskloom::services::ConcurrencyLimiter;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let limiter = ConcurrencyLimiter::new(2)?;
/// let runs = (0..5).map(|i| limiter.submit(async move { i * 2 }));
/// let doubled = futures::future::join_all(runs).await;
/// assert_eq!(doubled, vec![0, 2, 4, 6, 8]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    inner: Arc<Inner>,
}

impl ConcurrencyLimiter {
    pub fn new(concurrency: usize) -> Result<Self, LimiterError> {
        if concurrency == 0 {
            return Err(LimiterError::ZeroConcurrency);
        }
        Ok(Self {
            inner: Arc::new(Inner {
                concurrency,
                state: Mutex::new(LimiterState::default()),
            }),
        })
    }

    /// Submit an operation.
    ///
    /// The slot is reserved (or the queue position taken) before this
    /// returns. The returned future resolves to exactly what `operation`
    /// resolves to; a `Result` is passed through untouched.
    pub fn submit<F>(&self, operation: F) -> impl Future<Output = F::Output>
    where
        F: Future,
    {
        let admission = self.admit();
        async move {
            let _slot = admission.wait().await;
            operation.await
        }
    }

    fn admit(&self) -> Admission {
        let mut state = self.inner.lock();
        if state.running < self.inner.concurrency {
            state.running += 1;
            return Admission::Ready(Slot::handoff(Arc::clone(&self.inner)));
        }

        let (sender, receiver) = oneshot::channel();
        state.waiters.push_back(sender);
        Admission::Queued {
            receiver,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Configured bound.
    pub fn concurrency(&self) -> usize {
        self.inner.concurrency
    }

    /// Operations currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.inner.lock().running
    }

    /// Submissions waiting for a slot (including ones whose futures were
    /// dropped but not yet skipped).
    pub fn queued(&self) -> usize {
        self.inner.lock().waiters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio_test::{assert_pending, assert_ready};

    #[test]
    fn test_zero_concurrency_rejected() {
        assert_eq!(
            ConcurrencyLimiter::new(0).unwrap_err(),
            LimiterError::ZeroConcurrency
        );
    }

    #[tokio::test]
    async fn test_passes_through_values_and_errors() {
        let limiter = ConcurrencyLimiter::new(1).unwrap();
        let ok: Result<u32, String> = limiter.submit(async { Ok(7) }).await;
        let err: Result<u32, String> = limiter.submit(async { Err("boom".to_string()) }).await;

        assert_eq!(ok, Ok(7));
        assert_eq!(err, Err("boom".to_string()));
        assert_eq!(limiter.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_never_exceeds_bound() {
        let limiter = ConcurrencyLimiter::new(2).unwrap();
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let runs: Vec<_> = (0..5)
            .map(|_| {
                let current = Arc::clone(&current);
                let peak = Arc::clone(&peak);
                limiter.submit(async move {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        futures::future::join_all(runs).await;
        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(limiter.in_flight(), 0);
        assert_eq!(limiter.queued(), 0);
    }

    #[tokio::test]
    async fn test_admission_follows_submission_order() {
        let limiter = ConcurrencyLimiter::new(1).unwrap();
        let started = Arc::new(Mutex::new(Vec::new()));

        let mut runs: Vec<_> = (0..5)
            .map(|i| {
                let started = Arc::clone(&started);
                limiter.submit(async move {
                    started.lock().unwrap().push(i);
                    tokio::time::sleep(Duration::from_millis(2)).await;
                })
            })
            .collect();

        // Polling order must not matter.
        runs.reverse();
        futures::future::join_all(runs).await;

        assert_eq!(*started.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_queued_submission_waits_for_slot() {
        let limiter = ConcurrencyLimiter::new(1).unwrap();
        let (release_first, gate) = oneshot::channel::<()>();

        let mut first = tokio_test::task::spawn(limiter.submit(async move {
            let _ = gate.await;
            "first"
        }));
        let mut second = tokio_test::task::spawn(limiter.submit(async { "second" }));

        assert_pending!(first.poll());
        assert_pending!(second.poll());
        assert_eq!(limiter.in_flight(), 1);
        assert_eq!(limiter.queued(), 1);

        release_first.send(()).unwrap();
        assert_eq!(assert_ready!(first.poll()), "first");
        assert!(second.is_woken());
        assert_eq!(assert_ready!(second.poll()), "second");
        assert_eq!(limiter.in_flight(), 0);
    }

    #[test]
    fn test_dropped_waiter_is_skipped() {
        let limiter = ConcurrencyLimiter::new(1).unwrap();
        let (release_first, gate) = oneshot::channel::<()>();

        let mut first = tokio_test::task::spawn(limiter.submit(async move {
            let _ = gate.await;
        }));
        let abandoned = limiter.submit(async { 2 });
        let mut third = tokio_test::task::spawn(limiter.submit(async { 3 }));

        assert_pending!(first.poll());
        drop(abandoned);
        assert_pending!(third.poll());

        release_first.send(()).unwrap();
        assert_ready!(first.poll());
        assert_eq!(assert_ready!(third.poll()), 3);
        assert_eq!(limiter.in_flight(), 0);
        assert_eq!(limiter.queued(), 0);
    }

    #[tokio::test]
    async fn test_panicking_operation_releases_slot() {
        let limiter = ConcurrencyLimiter::new(1).unwrap();
        let handle = tokio::spawn(limiter.submit(async {
            panic!("operation failed hard");
        }));
        assert!(handle.await.is_err());

        assert_eq!(limiter.in_flight(), 0);
        assert_eq!(limiter.submit(async { 42 }).await, 42);
    }

    #[tokio::test]
    async fn test_clones_share_slots() {
        let limiter = ConcurrencyLimiter::new(1).unwrap();
        let clone = limiter.clone();
        let (release, gate) = oneshot::channel::<()>();

        let held = tokio::spawn(limiter.submit(async move {
            let _ = gate.await;
        }));
        // Admission happens at submit time, before the spawned task runs.
        assert_eq!(clone.in_flight(), 1);
        assert_eq!(clone.submit(async {}).now_or_never(), None);

        release.send(()).unwrap();
        held.await.unwrap();
        assert_eq!(clone.in_flight(), 0);
    }
}
