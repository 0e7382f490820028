// Per-path mutex table guarding concurrent reads of the same file.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;

/// Maps each path to its own mutex so workers racing on a duplicated path
/// (symlinks, repeated traversal) never interleave reads of one file.
/// Lookup takes the read lock; installing a missing entry takes the write
/// lock with a double check, since the mutex may have appeared while the
/// writer waited.
#[derive(Default)]
pub struct PathLocks {
    table: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mutex for `path`, installing it on first use.
    pub fn acquire(&self, path: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.table.read().get(path) {
            return lock.clone();
        }
        let mut table = self.table.write();
        table.entry(path.to_string()).or_default().clone()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.table.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_path_yields_same_mutex() {
        let locks = PathLocks::new();
        let a = locks.acquire("dir/a.json");
        let b = locks.acquire("dir/a.json");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn test_distinct_paths_yield_distinct_mutexes() {
        let locks = PathLocks::new();
        let a = locks.acquire("dir/a.json");
        let b = locks.acquire("dir/b.json");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_acquire_installs_one_mutex_per_path() {
        let locks = Arc::new(PathLocks::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let locks = locks.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..32 {
                    let path = format!("dir/file-{}.json", i % 4);
                    let lock = locks.acquire(&path);
                    let _guard = lock.lock().await;
                }
            }));
        }
        for handle in handles {
            handle.await.expect("acquire task failed");
        }
        assert_eq!(locks.len(), 4);
    }
}
