// File-system abstraction consumed by the crawler.
//
// The pipeline only needs directory enumeration, path joining and bounded
// reads, so the trait stays deliberately small. Closing a handle is
// dropping it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncReadExt;

/// A single entry reported by [`FileSystem::read_dir`].
#[derive(Debug, Clone)]
pub struct DirEntry {
    name: String,
    dir: bool,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, dir: bool) -> Self {
        Self {
            name: name.into(),
            dir,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_dir(&self) -> bool {
        self.dir
    }
}

/// Readable handle returned by [`FileSystem::open`].
#[async_trait]
pub trait FileHandle: Send {
    /// Reads up to `buf.len()` bytes, returning how many were read.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// The slice of file-system behaviour the crawler depends on.
/// Implementations must be thread-safe; workers share one instance.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Enumerates the entries of a directory.
    async fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>>;

    /// Joins a child name onto a parent path.
    fn join(&self, parent: &str, child: &str) -> String;

    /// Opens a file for reading.
    async fn open(&self, path: &str) -> Result<Box<dyn FileHandle>>;
}

/// Production implementation over the local disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let mut reader = fs::read_dir(path)
            .await
            .with_context(|| format!("read dir {path:?}"))?;
        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .with_context(|| format!("read dir {path:?}"))?
        {
            let file_type = entry
                .file_type()
                .await
                .with_context(|| format!("stat {:?}", entry.path()))?;
            entries.push(DirEntry::new(
                entry.file_name().to_string_lossy().into_owned(),
                file_type.is_dir(),
            ));
        }
        Ok(entries)
    }

    fn join(&self, parent: &str, child: &str) -> String {
        Path::new(parent).join(child).to_string_lossy().into_owned()
    }

    async fn open(&self, path: &str) -> Result<Box<dyn FileHandle>> {
        let file = fs::File::open(path)
            .await
            .with_context(|| format!("open {path:?}"))?;
        Ok(Box::new(LocalFile { file }))
    }
}

struct LocalFile {
    file: fs::File,
}

#[async_trait]
impl FileHandle for LocalFile {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.file.read(buf).await.map_err(Into::into)
    }
}
