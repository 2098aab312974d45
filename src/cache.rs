//! On-disk cache primitives shared by the index and metadata tiers.
//!
//! Staleness is judged from file modification time against the configured
//! clock, and every write lands through [`write_atomic`] so a reader never
//! sees a half-written artifact.

use crate::config::Config;
use crate::error::Result;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Age of a cache file relative to `now`, or `None` if it doesn't exist.
///
/// A modification time in the future counts as age zero.
pub fn age_of(path: &Path, now: SystemTime) -> Option<Duration> {
    let metadata = std::fs::metadata(path).ok()?;
    if !metadata.is_file() {
        return None;
    }
    let modified = metadata.modified().ok()?;
    Some(now.duration_since(modified).unwrap_or(Duration::ZERO))
}

/// Check if a cached file exists and is no older than `ttl`
pub fn is_fresh(path: &Path, ttl: Duration, now: SystemTime) -> bool {
    match age_of(path, now) {
        Some(age) => age <= ttl,
        None => false,
    }
}

/// Write `contents` to `path` by way of a sibling temp file and a rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = temp_path_for(path);
    if let Err(e) = std::fs::write(&tmp, contents) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }

    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cache".to_string());
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{}.{}.{}.tmp", file_name, std::process::id(), seq))
}

/// Summary of what's currently on disk
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub index_entries: usize,
    pub index_modified: Option<SystemTime>,
    pub metadata_records: usize,
    pub metadata_bytes: u64,
}

pub fn cache_stats(config: &Config) -> Result<CacheStats> {
    let mut stats = CacheStats::default();

    let index_path = config.index_path();
    if index_path.is_file() {
        stats.index_modified = std::fs::metadata(&index_path)?.modified().ok();
        let content = std::fs::read(&index_path)?;
        stats.index_entries = String::from_utf8_lossy(&content)
            .lines()
            .filter(|l| !l.is_empty())
            .count();
    }

    let meta_dir = config.metadata_dir();
    if meta_dir.exists() {
        for entry in walkdir::WalkDir::new(&meta_dir)
            .max_depth(1)
            .follow_links(false)
        {
            let entry = entry.map_err(|e| anyhow::anyhow!("Failed to read directory: {}", e))?;
            if entry.file_type().is_file() && is_json(entry.path()) {
                stats.metadata_records += 1;
                stats.metadata_bytes += entry
                    .metadata()
                    .map_err(|e| anyhow::anyhow!("Failed to read metadata: {}", e))?
                    .len();
            }
        }
    }

    Ok(stats)
}

/// Remove the index and every metadata record. Returns the number of files removed.
pub fn clear_caches(config: &Config) -> Result<usize> {
    let mut removed = 0;

    let index_path = config.index_path();
    if index_path.is_file() {
        std::fs::remove_file(&index_path)?;
        removed += 1;
    }

    let meta_dir = config.metadata_dir();
    if meta_dir.exists() {
        for entry in std::fs::read_dir(&meta_dir)? {
            let path = entry?.path();
            if path.is_file() && is_json(&path) {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
    }

    tracing::debug!(removed, cache_dir = %config.cache_dir.display(), "cleared caches");
    Ok(removed)
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
