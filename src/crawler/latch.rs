// First-error latch and panic-to-error conversion for pipeline callables.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tracing::debug;

/// Thread-safe holder for the first error observed across workers. Later
/// errors are dropped; the orchestrator only reads the latch after every
/// upstream worker has exited, so the final read never races a write.
#[derive(Default)]
pub struct ErrorLatch {
    slot: Mutex<Option<anyhow::Error>>,
}

impl ErrorLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `err` unless an earlier error is already latched.
    pub fn record(&self, err: anyhow::Error) {
        let mut slot = self.slot.lock();
        if slot.is_none() {
            *slot = Some(err);
        } else {
            debug!(
                component = "error-latch",
                event = "error_dropped",
                error = %err,
                "an error was already latched"
            );
        }
    }

    pub fn is_set(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Takes the latched error, leaving the latch empty.
    pub fn take(&self) -> Option<anyhow::Error> {
        self.slot.lock().take()
    }
}

/// Wraps a callable so that a panic carrying an `anyhow::Error` payload is
/// recorded on the latch and the call yields the zero value of its output
/// type, letting downstream stages see a harmless datum. Panics with any
/// other payload are re-raised.
pub fn guard<T, R, F, Fut>(
    latch: Arc<ErrorLatch>,
    f: F,
) -> impl Fn(T) -> BoxFuture<'static, R> + Send + Sync + Clone + 'static
where
    T: Send + 'static,
    R: Default + Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    move |item| {
        let f = f.clone();
        let latch = latch.clone();
        async move {
            match AssertUnwindSafe(f(item)).catch_unwind().await {
                Ok(out) => out,
                Err(payload) => match payload.downcast::<anyhow::Error>() {
                    Ok(err) => {
                        latch.record(*err);
                        R::default()
                    }
                    Err(payload) => std::panic::resume_unwind(payload),
                },
            }
        }
        .boxed()
    }
}

/// Two-argument variant of [`guard`] for accumulators. On recovery the
/// in-flight partial is replaced by the zero value, which the combine
/// treats as identity.
pub fn guard_fold<T, R, F, Fut>(
    latch: Arc<ErrorLatch>,
    f: F,
) -> impl Fn(T, R) -> BoxFuture<'static, R> + Send + Sync + Clone + 'static
where
    T: Send + 'static,
    R: Default + Send + 'static,
    F: Fn(T, R) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    move |item, partial| {
        let f = f.clone();
        let latch = latch.clone();
        async move {
            match AssertUnwindSafe(f(item, partial)).catch_unwind().await {
                Ok(out) => out,
                Err(payload) => match payload.downcast::<anyhow::Error>() {
                    Ok(err) => {
                        latch.record(*err);
                        R::default()
                    }
                    Err(payload) => std::panic::resume_unwind(payload),
                },
            }
        }
        .boxed()
    }
}
