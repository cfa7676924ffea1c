// src/watch/hash.rs

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// blake3 hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let contents = fs.read(path)?;
    Ok(blake3::hash(&contents).to_hex().to_string())
}

/// Hash over per-file hashes. `hashes` must be ordered by file path.
pub fn compute_aggregate_hash(hashes: &[String]) -> String {
    let mut hasher = Hasher::new();
    for h in hashes {
        hasher.update(h.as_bytes());
    }
    let hash = hasher.finalize().to_hex().to_string();
    debug!(files = hashes.len(), hash = %hash, "computed aggregate hash");
    hash
}

/// Last seen aggregate hash per `use_hash` binding, kept for the lifetime
/// of the watch session.
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    map: HashMap<String, String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    pub fn save(&mut self, key: &str, hash: &str) {
        self.map.insert(key.to_string(), hash.to_string());
        debug!(key, hash, "stored watch hash");
    }
}
