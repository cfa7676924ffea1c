// src/watch/cache.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::trace;

use crate::fs::FileSystem;
use crate::watch::hash::compute_file_hash;

/// Per-file blake3 hashes, valid until the watcher reports the file changed.
///
/// Rehashing a `use_hash` binding then only reads the files of the current
/// batch; everything else comes from here.
#[derive(Debug, Default)]
pub struct FileCache {
    hashes: HashMap<PathBuf, String>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hash_of(&mut self, fs: &dyn FileSystem, path: &Path) -> Result<String> {
        if let Some(hash) = self.hashes.get(path) {
            return Ok(hash.clone());
        }
        let hash = compute_file_hash(fs, path)?;
        trace!(path = %path.display(), %hash, "hashed file");
        Ok(self.hashes.entry(path.to_path_buf()).or_insert(hash).clone())
    }

    /// Drop the hash of a changed file.
    pub fn forget(&mut self, path: &Path) {
        self.hashes.remove(path);
    }
}
