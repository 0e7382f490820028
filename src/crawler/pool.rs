// Worker-pool primitives: transform, accumulate and hierarchical listing.
//
// Each operation owns its worker cohort. Workers are tokio tasks pulling
// from a shared input receiver; every blocking channel operation is raced
// against the cancellation token, so cancelled pipelines drain promptly.
// A reaper joins the cohort and is the single closer of the output channel,
// which makes "no send after close" structural rather than accidental.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Capacity used for every pipeline channel. Capacity one keeps stages in
/// lock-step the way a rendezvous channel would.
pub(crate) const CHANNEL_CAPACITY: usize = 1;

/// Spawns `workers` concurrent consumers of `input`, each applying
/// `transformer` and emitting the result on the returned channel. The
/// transformer is shared across workers and must be thread-safe.
pub fn transform<T, R, F, Fut>(
    ctx: CancellationToken,
    workers: usize,
    input: mpsc::Receiver<T>,
    transformer: F,
) -> mpsc::Receiver<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let input = Arc::new(Mutex::new(input));
    let mut set = JoinSet::new();

    for _ in 0..workers {
        let ctx = ctx.clone();
        let input = input.clone();
        let tx = tx.clone();
        let transformer = transformer.clone();
        set.spawn(async move {
            loop {
                let item = tokio::select! {
                    _ = ctx.cancelled() => return,
                    item = async { input.lock().await.recv().await } => match item {
                        Some(item) => item,
                        None => return,
                    },
                };
                let out = transformer(item).await;
                tokio::select! {
                    _ = ctx.cancelled() => return,
                    sent = tx.send(out) => {
                        if sent.is_err() {
                            return;
                        }
                    }
                }
            }
        });
    }

    reap(set, tx);
    rx
}

/// Spawns `workers` folders over `input`. Each worker keeps its own partial
/// result seeded with `R::default()` and emits it once the input closes, so
/// the returned channel yields exactly one partial per worker (fewer under
/// cancellation). The accumulator is shared across workers and must be
/// thread-safe.
pub fn accumulate<T, R, F, Fut>(
    ctx: CancellationToken,
    workers: usize,
    input: mpsc::Receiver<T>,
    accumulator: F,
) -> mpsc::Receiver<R>
where
    T: Send + 'static,
    R: Default + Send + 'static,
    F: Fn(T, R) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let input = Arc::new(Mutex::new(input));
    let mut set = JoinSet::new();

    for _ in 0..workers {
        let ctx = ctx.clone();
        let input = input.clone();
        let tx = tx.clone();
        let accumulator = accumulator.clone();
        set.spawn(async move {
            let mut partial = R::default();
            loop {
                let item = tokio::select! {
                    _ = ctx.cancelled() => return,
                    item = async { input.lock().await.recv().await } => item,
                };
                match item {
                    Some(item) => partial = accumulator(item, partial).await,
                    None => {
                        // Input drained: hand over the partial result.
                        tokio::select! {
                            _ = ctx.cancelled() => {}
                            _ = tx.send(partial) => {}
                        }
                        return;
                    }
                }
            }
        });
    }

    reap(set, tx);
    rx
}

/// Breadth-first expansion from `start` with a barrier per level: every
/// parent of a level is fed to `workers` concurrent searchers, their
/// children are collected into the next level, and the cohort is fully
/// joined before that level begins. Terminates on an empty level or on
/// cancellation; either way no task outlives the call.
pub async fn list<T, F, Fut>(ctx: CancellationToken, workers: usize, start: T, searcher: F)
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = Vec<T>> + Send + 'static,
{
    let mut level = vec![start];

    while !level.is_empty() {
        let (input_tx, input_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (result_tx, mut result_rx) = mpsc::channel::<Vec<T>>(CHANNEL_CAPACITY);
        let input_rx = Arc::new(Mutex::new(input_rx));
        let mut set = JoinSet::new();

        for _ in 0..workers {
            let ctx = ctx.clone();
            let input_rx = input_rx.clone();
            let result_tx = result_tx.clone();
            let searcher = searcher.clone();
            set.spawn(async move {
                loop {
                    let parent = tokio::select! {
                        _ = ctx.cancelled() => return,
                        parent = async { input_rx.lock().await.recv().await } => match parent {
                            Some(parent) => parent,
                            None => return,
                        },
                    };
                    let children = searcher(parent).await;
                    tokio::select! {
                        _ = ctx.cancelled() => return,
                        sent = result_tx.send(children) => {
                            if sent.is_err() {
                                return;
                            }
                        }
                    }
                }
            });
        }
        // Workers hold the only remaining result senders; the channel closes
        // when the last of them exits.
        drop(result_tx);

        let feeder = {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                for parent in level {
                    tokio::select! {
                        _ = ctx.cancelled() => return,
                        sent = input_tx.send(parent) => {
                            if sent.is_err() {
                                return;
                            }
                        }
                    }
                }
            })
        };

        let mut next = Vec::new();
        loop {
            tokio::select! {
                _ = ctx.cancelled() => break,
                children = result_rx.recv() => match children {
                    Some(mut children) => next.append(&mut children),
                    None => break,
                },
            }
        }

        // Level barrier: every searcher and the feeder must be gone before
        // the next level starts. Dropping the driver's receiver handle after
        // the join closes the input channel, so a feeder still holding items
        // (workers died mid-level) unblocks instead of hanging.
        let panic = join_all(&mut set).await;
        drop(input_rx);
        let _ = feeder.await;
        if let Some(payload) = panic {
            std::panic::resume_unwind(payload);
        }
        if ctx.is_cancelled() {
            return;
        }
        level = next;
    }
}

/// Joins every worker, remembering the first panic so it can be re-raised
/// after the whole cohort has exited.
async fn join_all(set: &mut JoinSet<()>) -> Option<Box<dyn Any + Send>> {
    let mut panic = None;
    while let Some(joined) = set.join_next().await {
        if let Err(err) = joined {
            if err.is_panic() && panic.is_none() {
                panic = Some(err.into_panic());
            }
        }
    }
    panic
}

/// Joins the worker cohort, then closes the stage output by dropping the
/// last sender. Panics that escaped the guard are re-raised once every
/// worker has exited.
fn reap<R: Send + 'static>(mut set: JoinSet<()>, tx: mpsc::Sender<R>) {
    tokio::spawn(async move {
        let panic = join_all(&mut set).await;
        drop(tx);
        if let Some(payload) = panic {
            std::panic::resume_unwind(payload);
        }
    });
}
