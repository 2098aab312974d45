// Test helpers for isolated testing
// Provides throwaway cache directories and an in-memory registry

#![allow(dead_code)]

use pipfind::{Config, PipfindError, ProjectDocument, ProjectInfo, Registry, Result};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Isolated cache directory, removed when dropped
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub cache: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = temp_dir.path().join("cache");
        std::fs::create_dir_all(&cache).unwrap();
        Self { temp_dir, cache }
    }

    /// Config rooted in this environment
    pub fn config(&self) -> Config {
        let mut config = Config::with_cache_dir(&self.cache);
        config.jobs = 4;
        config
    }

    pub fn write_index(&self, names: &[&str]) {
        let mut content = names.join("\n");
        content.push('\n');
        std::fs::write(self.cache.join("index.txt"), content).unwrap();
    }

    pub fn read_index(&self) -> String {
        std::fs::read_to_string(self.cache.join("index.txt")).unwrap()
    }

    pub fn meta_path(&self, name: &str) -> PathBuf {
        self.cache.join("meta").join(format!("{}.json", name))
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

/// Render names the way the PyPI simple index does
pub fn simple_index_page(names: &[&str]) -> String {
    let mut page = String::from(
        "<!DOCTYPE html>\n<html>\n  <head>\n    <meta name=\"pypi:repository-version\" content=\"1.1\">\n    <title>Simple index</title>\n  </head>\n  <body>\n",
    );
    for name in names {
        page.push_str(&format!("    <a href=\"/simple/{0}/\">{0}</a>\n", name));
    }
    page.push_str("  </body>\n</html>\n");
    page
}

pub fn project(name: &str, version: &str, summary: &str) -> ProjectDocument {
    let releases = HashMap::from([(
        version.to_string(),
        serde_json::json!([{ "filename": format!("{}-{}.tar.gz", name, version) }]),
    )]);
    ProjectDocument {
        info: ProjectInfo {
            name: name.to_string(),
            version: version.to_string(),
            summary: Some(summary.to_string()),
            description: Some(format!("Long description of {}", name)),
        },
        releases: Some(releases),
    }
}

/// In-memory registry that records how it was called
#[derive(Default)]
pub struct FakeRegistry {
    index: Mutex<Option<String>>,
    projects: Mutex<HashMap<String, ProjectDocument>>,
    broken: Mutex<HashSet<String>>,
    delay: Option<Duration>,
    pub index_calls: AtomicUsize,
    pub project_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(names: &[&str]) -> Self {
        let registry = Self::new();
        registry.set_index(Some(simple_index_page(names)));
        registry
    }

    /// Delay every project fetch so parallel lookups overlap
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// `None` makes index fetches fail
    pub fn set_index(&self, document: Option<String>) {
        *self.index.lock().unwrap() = document;
    }

    pub fn add_project(&self, doc: ProjectDocument) {
        let key = doc.info.name.to_lowercase();
        self.projects.lock().unwrap().insert(key, doc);
    }

    /// Make fetches for `name` fail with a transport-style error
    pub fn break_project(&self, name: &str) {
        self.broken.lock().unwrap().insert(name.to_string());
    }

    pub fn index_calls(&self) -> usize {
        self.index_calls.load(Ordering::SeqCst)
    }

    pub fn project_calls(&self) -> usize {
        self.project_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Registry for FakeRegistry {
    async fn fetch_index(&self) -> Result<String> {
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        let document = self.index.lock().unwrap().clone();
        document.ok_or_else(|| PipfindError::Fetch {
            url: "fake://simple/".to_string(),
            reason: "connection refused".to_string(),
        })
    }

    async fn fetch_project(&self, name: &str) -> Result<ProjectDocument> {
        self.project_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = if self.broken.lock().unwrap().contains(name) {
            Err(PipfindError::Fetch {
                url: format!("fake://pypi/{}/json", name),
                reason: "connection reset".to_string(),
            })
        } else {
            self.projects
                .lock()
                .unwrap()
                .get(&name.to_lowercase())
                .cloned()
                .ok_or_else(|| PipfindError::NotFound(name.to_string()))
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_creates_cache_dir() {
        let env = TestEnvironment::new();
        assert!(env.cache.exists());
        assert_eq!(env.config().cache_dir, env.cache);
    }

    #[test]
    fn test_environment_cleanup() {
        let cache = {
            let env = TestEnvironment::new();
            env.cache.clone()
        };
        assert!(!cache.exists());
    }

    #[test]
    fn test_simple_index_page_parses() {
        let page = simple_index_page(&["a", "b"]);
        assert_eq!(pipfind::index::parse_listing(&page), vec!["a", "b"]);
    }
}
