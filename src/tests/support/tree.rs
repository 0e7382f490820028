//! On-disk directory tree builder for crawler integration tests.

use std::fs;
use std::path::Path;

/// Materialises `files` under `root`, creating intermediate directories.
/// Paths are '/'-separated and relative to `root`.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (rel, content) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create tree directories");
        }
        fs::write(&path, content).expect("write tree file");
    }
}
