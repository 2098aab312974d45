//! Per-package metadata cache.
//!
//! Each package gets one JSON record under `<cache>/meta/<name>.json`. A
//! record is served from disk until it is older than the metadata TTL, then
//! refetched from the registry. Packages the registry can't describe (404,
//! no uploaded files, transport failure) get a placeholder record instead of
//! an error, and the placeholder is cached like any other record.
//!
//! Within one [`MetadataCache`] a `moka` cache coalesces lookups, so a name
//! requested twice in the same run is loaded once.

use crate::api::{ProjectDocument, Registry};
use crate::cache;
use crate::config::{Clock, Config};
use crate::error::PipfindError;
use futures::StreamExt;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const PLACEHOLDER_VERSION: &str = "?.?.?";

/// Where a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Fetched,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub name: String,
    pub version: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub provenance: Provenance,
}

impl MetadataRecord {
    /// Stand-in for a package with nothing to show.
    pub fn placeholder(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: PLACEHOLDER_VERSION.to_string(),
            summary: format!("** {} has no released files", name),
            description: None,
            provenance: Provenance::Placeholder,
        }
    }

    /// Record for `requested` built from a registry document.
    ///
    /// Documents without any uploaded file become placeholders.
    pub fn from_document(requested: &str, doc: ProjectDocument) -> Self {
        if !doc.has_released_files() {
            return Self::placeholder(requested);
        }

        let info = doc.info;
        Self {
            name: if info.name.is_empty() {
                requested.to_string()
            } else {
                info.name
            },
            version: info.version,
            summary: info.summary.unwrap_or_default(),
            description: info.description.filter(|d| !d.is_empty()),
            provenance: Provenance::Fetched,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.provenance == Provenance::Placeholder
    }
}

pub struct MetadataCache<'a, R: Registry> {
    registry: &'a R,
    dir: PathBuf,
    ttl: Duration,
    clock: Clock,
    jobs: usize,
    loaded: moka::future::Cache<String, MetadataRecord>,
}

impl<'a, R: Registry> MetadataCache<'a, R> {
    pub fn new(config: &Config, registry: &'a R) -> Self {
        Self {
            registry,
            dir: config.metadata_dir(),
            ttl: config.ttl_meta,
            clock: config.clock,
            jobs: config.jobs.max(1),
            loaded: moka::future::Cache::new(10_000),
        }
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// On-disk location of the record for `name`.
    pub fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(name)))
    }

    /// The record for `name`, fetching it when missing, stale or forced.
    ///
    /// Never fails: anything the registry can't provide becomes a placeholder.
    pub async fn get(&self, name: &str, force_refresh: bool) -> MetadataRecord {
        if force_refresh {
            self.loaded.invalidate(name).await;
        }
        self.loaded
            .get_with(name.to_string(), self.load(name, force_refresh))
            .await
    }

    /// Fetch records for every name with bounded parallelism.
    ///
    /// Returns once all lookups have finished, in completion order. Duplicate
    /// names are looked up once.
    pub async fn populate(
        &self,
        names: &[String],
        force_refresh: bool,
        progress: Option<&ProgressBar>,
    ) -> Vec<MetadataRecord> {
        let mut seen = HashSet::new();
        let unique: Vec<&str> = names
            .iter()
            .map(String::as_str)
            .filter(|n| seen.insert(*n))
            .collect();

        tracing::debug!(count = unique.len(), jobs = self.jobs, "populating metadata");

        futures::stream::iter(unique)
            .map(|name| async move {
                let record = self.get(name, force_refresh).await;
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                record
            })
            .buffer_unordered(self.jobs)
            .collect()
            .await
    }

    async fn load(&self, name: &str, force_refresh: bool) -> MetadataRecord {
        let path = self.record_path(name);

        if !force_refresh && cache::is_fresh(&path, self.ttl, self.clock.now()) {
            match read_record(&path) {
                Ok(record) => return record,
                Err(e) => tracing::warn!(name = %name, error = %e, "discarding cached metadata"),
            }
        }

        let record = match self.registry.fetch_project(name).await {
            Ok(doc) => MetadataRecord::from_document(name, doc),
            Err(PipfindError::NotFound(_)) => {
                tracing::debug!(name = %name, "package not found on registry");
                MetadataRecord::placeholder(name)
            }
            Err(e) => {
                tracing::warn!(name = %name, error = %e, "metadata fetch failed");
                MetadataRecord::placeholder(name)
            }
        };

        if let Err(e) = write_record(&path, &record) {
            tracing::warn!(name = %name, path = %path.display(), error = %e, "failed to cache metadata");
        }

        record
    }
}

fn read_record(path: &Path) -> crate::error::Result<MetadataRecord> {
    let content = std::fs::read(path)?;
    serde_json::from_slice(&content).map_err(|e| PipfindError::CacheCorruption {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn write_record(path: &Path, record: &MetadataRecord) -> crate::error::Result<()> {
    let json = serde_json::to_vec_pretty(record)?;
    cache::write_atomic(path, &json)
}

/// File-name-safe form of a package name.
fn file_stem(name: &str) -> String {
    let mut stem: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() || stem.starts_with('.') {
        stem.insert(0, '_');
    }
    stem
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ProjectInfo;
    use std::collections::HashMap;

    #[test]
    fn test_placeholder_shape() {
        let record = MetadataRecord::placeholder("doesnotexist123");
        assert_eq!(record.name, "doesnotexist123");
        assert_eq!(record.version, "?.?.?");
        assert_eq!(record.summary, "** doesnotexist123 has no released files");
        assert!(record.description.is_none());
        assert!(record.is_placeholder());
    }

    #[test]
    fn test_from_document() {
        let doc = ProjectDocument {
            info: ProjectInfo {
                name: "Flask".to_string(),
                version: "3.0.3".to_string(),
                summary: None,
                description: Some(String::new()),
            },
            releases: None,
        };
        let record = MetadataRecord::from_document("flask", doc);
        assert_eq!(record.name, "Flask");
        assert_eq!(record.summary, "");
        assert!(record.description.is_none());
        assert_eq!(record.provenance, Provenance::Fetched);
    }

    #[test]
    fn test_from_document_without_files() {
        let doc = ProjectDocument {
            info: ProjectInfo {
                name: "empty".to_string(),
                version: "0.1".to_string(),
                ..Default::default()
            },
            releases: Some(HashMap::from([(
                "0.1".to_string(),
                serde_json::Value::Array(vec![]),
            )])),
        };
        assert!(MetadataRecord::from_document("empty", doc).is_placeholder());
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("requests"), "requests");
        assert_eq!(file_stem("zope.interface"), "zope.interface");
        assert_eq!(file_stem("../etc/passwd"), "_.._etc_passwd");
        assert_eq!(file_stem(""), "_");
    }

    #[test]
    fn test_record_json_roundtrip_omits_missing_description() {
        let record = MetadataRecord::placeholder("x");
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("description"));
        assert!(json.contains(r#""provenance":"placeholder""#));
        let back: MetadataRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
