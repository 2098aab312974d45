//! PyPI HTTP client.
//!
//! Two endpoints are used:
//!
//! - the simple index (`https://pypi.org/simple/`), an HTML page with one
//!   anchor per project, fetched whole by [`Registry::fetch_index`]
//! - the JSON API (`https://pypi.org/pypi/<name>/json`), fetched per package by
//!   [`Registry::fetch_project`]
//!
//! The caches talk to the network only through the [`Registry`] trait so they
//! can be driven by an in-memory registry in tests.
//!
//! # Examples
//!
//! ```no_run
//! use pipfind::{Config, PypiApi, Registry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let api = PypiApi::new(&Config::from_env()?)?;
//!     let project = api.fetch_project("requests").await?;
//!     println!("{} {}", project.info.name, project.info.version);
//!     Ok(())
//! }
//! ```

use crate::config::Config;
use crate::error::{PipfindError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

/// Remote source of the package listing and per-package documents.
pub trait Registry: Send + Sync {
    /// Fetch the raw index listing document.
    fn fetch_index(&self) -> impl Future<Output = Result<String>> + Send;

    /// Fetch the JSON document for one package.
    ///
    /// A package the registry doesn't know must yield [`PipfindError::NotFound`].
    fn fetch_project(&self, name: &str) -> impl Future<Output = Result<ProjectDocument>> + Send;
}

/// The `info` block of a PyPI JSON document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// PyPI JSON document for a single project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectDocument {
    pub info: ProjectInfo,
    /// Version -> uploaded files. Absent when the endpoint omits it.
    #[serde(default)]
    pub releases: Option<HashMap<String, serde_json::Value>>,
}

impl ProjectDocument {
    /// Whether any release carries at least one uploaded file.
    ///
    /// Documents without a `releases` map are trusted as released.
    pub fn has_released_files(&self) -> bool {
        match &self.releases {
            None => true,
            Some(releases) => releases
                .values()
                .any(|files| files.as_array().is_some_and(|f| !f.is_empty())),
        }
    }
}

/// PyPI client backed by `reqwest`
#[derive(Clone)]
pub struct PypiApi {
    client: reqwest::Client,
    index_url: String,
    metadata_base_url: String,
}

impl PypiApi {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(config.jobs.max(1))
            .user_agent(format!("pipfind/{}", env!("CARGO_PKG_VERSION")));

        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            index_url: config.index_url.clone(),
            metadata_base_url: config.metadata_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn project_url(&self, name: &str) -> String {
        format!("{}/{}/json", self.metadata_base_url, name)
    }
}

impl Registry for PypiApi {
    async fn fetch_index(&self) -> Result<String> {
        tracing::debug!(url = %self.index_url, "fetching package index");

        let response = self
            .client
            .get(&self.index_url)
            .send()
            .await
            .map_err(|e| PipfindError::fetch(&self.index_url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipfindError::fetch(&self.index_url, status));
        }

        response
            .text()
            .await
            .map_err(|e| PipfindError::fetch(&self.index_url, e))
    }

    async fn fetch_project(&self, name: &str) -> Result<ProjectDocument> {
        let url = self.project_url(name);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PipfindError::NotFound(name.to_string()));
        }
        if !status.is_success() {
            return Err(PipfindError::fetch(url, status));
        }

        Ok(response.json().await?)
    }
}
