// Crawler configuration loading and validation.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Worker counts for the three crawl stages. Every count must be positive
/// for the pipeline to make progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Configuration {
    /// Workers walking the directory tree.
    pub search_workers: usize,
    /// Workers reading and deserialising individual files.
    pub file_workers: usize,
    /// Workers folding records into partial results.
    pub accumulator_workers: usize,
}

impl Configuration {
    pub fn new(search_workers: usize, file_workers: usize, accumulator_workers: usize) -> Self {
        Self {
            search_workers,
            file_workers,
            accumulator_workers,
        }
    }

    /// Loads configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("read config yaml file {path:?}"))?;
        let conf: Self = serde_yaml::from_str(&data)
            .with_context(|| format!("unmarshal yaml from {path:?}"))?;
        conf.validate()?;
        Ok(conf)
    }

    /// Rejects worker counts that would stall a stage.
    pub fn validate(&self) -> Result<()> {
        if self.search_workers == 0 {
            bail!("search_workers must be positive");
        }
        if self.file_workers == 0 {
            bail!("file_workers must be positive");
        }
        if self.accumulator_workers == 0 {
            bail!("accumulator_workers must be positive");
        }
        Ok(())
    }
}
