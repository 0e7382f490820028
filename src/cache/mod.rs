//! Constant-time LFU cache built on arena-backed intrusive lists.

pub mod lfu;
pub mod list;

#[cfg(test)]
mod lfu_test;
#[cfg(test)]
mod list_test;

// Re-export main types
pub use lfu::{KeyNotFoundError, LfuCache, DEFAULT_CAPACITY};
pub use list::{Arena, List, NodeRef};
