// Map-reduce crawler orchestration over the worker-pool primitives.
//
// Collect wires three stages into one pipeline: a breadth-first walker
// publishing file paths, a transform pool reading and deserialising each
// file, and an accumulate pool folding records into partial results. The
// partials are drained into a slice before the single-threaded combine so
// no upstream worker can block, and the walker is awaited before the latch
// is read, which makes the first-error outcome deterministic.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::Configuration;

use super::fs::FileSystem;
use super::latch::{guard, guard_fold, ErrorLatch};
use super::lock::PathLocks;
use super::pool;

/// Error returned by [`collect`].
#[derive(Debug)]
pub enum CrawlError<R> {
    /// The crawl was cancelled and no other error was latched first.
    /// Carries the result combined from every partial drained before the
    /// cancellation was observed, so a merely-cancelled crawl does not lose
    /// the work it finished.
    Cancelled(R),
    /// The first error latched by any stage.
    Failed(anyhow::Error),
}

impl<R> fmt::Display for CrawlError<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled(_) => write!(f, "crawl cancelled"),
            Self::Failed(err) => err.fmt(f),
        }
    }
}

impl<R: fmt::Debug> std::error::Error for CrawlError<R> {}

impl<R> From<anyhow::Error> for CrawlError<R> {
    fn from(err: anyhow::Error) -> Self {
        Self::Failed(err)
    }
}

/// One bounded read is enough for the documents this pipeline handles;
/// longer files are truncated by contract.
const READ_BUFFER_SIZE: usize = 512;

/// Walks the tree under `root`, deserialises every regular file into a `T`
/// record, folds records into per-worker partials with `accumulator` and
/// combines the partials with `combiner` starting from `R::default()`.
///
/// The accumulator runs concurrently and must be thread-safe; the combiner
/// runs on the calling task only. The first error observed at any stage is
/// returned after a clean shutdown: when this function returns, no walker,
/// searcher or pool worker is left running. A cancellation with no latched
/// error still combines whatever partials were drained and hands that value
/// back inside [`CrawlError::Cancelled`].
pub async fn collect<T, R, A, AFut, C>(
    ctx: CancellationToken,
    file_system: Arc<dyn FileSystem>,
    root: impl Into<String>,
    conf: Configuration,
    accumulator: A,
    mut combiner: C,
) -> Result<R, CrawlError<R>>
where
    T: DeserializeOwned + Default + Send + 'static,
    R: Default + Send + 'static,
    A: Fn(T, R) -> AFut + Send + Sync + Clone + 'static,
    AFut: Future<Output = R> + Send + 'static,
    C: FnMut(R, R) -> R,
{
    conf.validate()?;
    let root = root.into();
    debug!(
        component = "crawler",
        event = "collect_start",
        root = %root,
        search_workers = conf.search_workers,
        file_workers = conf.file_workers,
        accumulator_workers = conf.accumulator_workers,
        "starting collection"
    );

    let latch = Arc::new(ErrorLatch::new());
    let locks = Arc::new(PathLocks::new());
    let (path_tx, path_rx) = mpsc::channel::<String>(pool::CHANNEL_CAPACITY);

    // The searcher descends into subdirectories by returning them as
    // children and publishes regular files on the path channel. It holds a
    // path sender, so the channel closes exactly when the walker task below
    // drops the searcher after every invocation has finished.
    let searcher = guard(latch.clone(), {
        let ctx = ctx.clone();
        let fs = file_system.clone();
        let latch = latch.clone();
        move |parent: String| {
            let ctx = ctx.clone();
            let fs = fs.clone();
            let latch = latch.clone();
            let path_tx = path_tx.clone();
            async move {
                let entries = match fs.read_dir(&parent).await {
                    Ok(entries) => entries,
                    Err(err) => {
                        latch.record(err);
                        return Vec::new();
                    }
                };
                let mut dirs = Vec::new();
                for entry in &entries {
                    let joined = fs.join(&parent, entry.name());
                    if entry.is_dir() {
                        dirs.push(joined);
                    } else {
                        tokio::select! {
                            _ = ctx.cancelled() => return Vec::new(),
                            sent = path_tx.send(joined) => {
                                if sent.is_err() {
                                    return Vec::new();
                                }
                            }
                        }
                    }
                }
                dirs
            }
        }
    });

    let walker = {
        let ctx = ctx.clone();
        let workers = conf.search_workers;
        let root = root.clone();
        tokio::spawn(async move {
            pool::list(ctx, workers, root, searcher).await;
        })
    };

    let reader = guard(latch.clone(), {
        let fs = file_system.clone();
        let latch = latch.clone();
        let locks = locks.clone();
        move |path: String| {
            let fs = fs.clone();
            let latch = latch.clone();
            let locks = locks.clone();
            async move {
                match read_record::<T>(fs.as_ref(), &locks, &path).await {
                    Ok(record) => record,
                    Err(err) => {
                        latch.record(err);
                        T::default()
                    }
                }
            }
        }
    });

    let record_rx = pool::transform(ctx.clone(), conf.file_workers, path_rx, reader);
    let mut partial_rx = pool::accumulate(
        ctx.clone(),
        conf.accumulator_workers,
        record_rx,
        guard_fold(latch.clone(), accumulator),
    );

    // Drain first: the combiner is single-threaded and draining keeps the
    // accumulate workers from ever blocking on a full channel.
    let mut partials = Vec::new();
    while let Some(partial) = partial_rx.recv().await {
        partials.push(partial);
    }

    // The partial channel is closed, so both pools are done; awaiting the
    // walker guarantees no traversal task outlives the call either.
    if let Err(err) = walker.await {
        if err.is_panic() {
            std::panic::resume_unwind(err.into_panic());
        }
    }

    if let Some(err) = latch.take() {
        debug!(
            component = "crawler",
            event = "collect_failed",
            root = %root,
            error = %err,
            "returning first latched error"
        );
        return Err(CrawlError::Failed(err));
    }

    let mut result = R::default();
    for partial in partials {
        result = combiner(partial, result);
    }
    if ctx.is_cancelled() {
        return Err(CrawlError::Cancelled(result));
    }
    debug!(
        component = "crawler",
        event = "collect_done",
        root = %root,
        "collection finished"
    );
    Ok(result)
}

/// Opens `path`, performs one bounded read under the per-path mutex and
/// deserialises the content as a single JSON document.
async fn read_record<T>(fs: &dyn FileSystem, locks: &PathLocks, path: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let mut file = fs.open(path).await?;
    let lock = locks.acquire(path);
    let mut buffer = [0u8; READ_BUFFER_SIZE];
    let read = {
        let _guard = lock.lock().await;
        file.read(&mut buffer).await?
    };
    drop(file);
    serde_json::from_slice(&buffer[..read]).with_context(|| format!("decode {path:?}"))
}
