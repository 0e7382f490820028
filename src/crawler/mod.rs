//! Concurrent map-reduce crawler: worker-pool primitives, a file-system
//! abstraction and the collection orchestrator.

pub mod crawler;
pub mod fs;
pub mod latch;
pub mod lock;
pub mod pool;


// Re-export main types
pub use crawler::{collect, CrawlError};
pub use fs::{DirEntry, FileHandle, FileSystem, LocalFileSystem};
pub use latch::{guard, guard_fold, ErrorLatch};
pub use lock::PathLocks;
pub use pool::{accumulate, list, transform};
