//! Digest-keyed report cache.
//!
//! A run whose coordinate and restraint inputs hash to a digest seen before
//! can reload the stored report instead of re-evaluating. The cache file is
//! plain JSON; the digest is part of the file name, so a stale entry is
//! simply never looked up again.

use crate::error::{Result, TetherError};
use crate::report::ValidationReport;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use std::path::{Path, PathBuf};

/// Stable hex digest of raw input bytes.
pub(crate) fn content_digest(parts: &[&[u8]]) -> String {
    let mut hasher = DefaultHasher::new();
    for part in parts {
        hasher.write(part);
    }
    format!("{:016x}", hasher.finish())
}

pub struct ReportCache {
    dir: PathBuf,
}

impl ReportCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ReportCache { dir: dir.into() }
    }

    fn path_for(&self, digest: &str) -> PathBuf {
        self.dir.join(format!("tether-report-{digest}.json"))
    }

    /// Load a cached report; `None` on a miss or an unreadable entry.
    pub fn load(&self, digest: &str) -> Option<ValidationReport> {
        let path = self.path_for(digest);
        let bytes = std::fs::read(&path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(report) => {
                log::info!("reusing cached report {}", path.display());
                Some(report)
            }
            Err(err) => {
                log::warn!("ignoring unreadable cache entry {}: {err}", path.display());
                None
            }
        }
    }

    /// Store a report under the digest, creating the cache directory if
    /// needed. Returns the path written.
    pub fn store(&self, digest: &str, report: &ValidationReport) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(digest);
        let bytes = serde_json::to_vec(report)
            .map_err(|err| TetherError::Cache(format!("serializing report: {err}")))?;
        std::fs::write(&path, bytes)?;
        Ok(path)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_stable_and_input_sensitive() {
        let a = content_digest(&[b"coords", b"restraints"]);
        let b = content_digest(&[b"coords", b"restraints"]);
        let c = content_digest(&[b"coords", b"other"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_store_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ReportCache::new(dir.path());
        let report = ValidationReport {
            model_count: 2,
            model_ids: vec![1, 2],
            representative_model_id: 1,
            ..Default::default()
        };

        let digest = content_digest(&[b"input"]);
        cache.store(&digest, &report).unwrap();

        let reloaded = cache.load(&digest).unwrap();
        assert_eq!(reloaded.model_count, 2);
        assert_eq!(reloaded.model_ids, vec![1, 2]);
        assert!(cache.load("0000000000000000").is_none());
    }
}
