//! End-to-end search: index -> matches -> metadata -> rendered table.
//!
//! # Examples
//!
//! ```no_run
//! use pipfind::{Config, PypiApi, SearchOptions, Searcher};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let api = PypiApi::new(&config)?;
//!     let outcome = Searcher::new(&config, &api)
//!         .run(&SearchOptions::for_query("requests"))
//!         .await?;
//!     print!("{}", outcome.output);
//!     Ok(())
//! }
//! ```

use crate::api::Registry;
use crate::config::Config;
use crate::error::{PipfindError, Result};
use crate::index::IndexCache;
use crate::matcher::{self, Matcher, Substring};
use crate::metadata::MetadataCache;
use crate::progress;
use crate::table::{self, Field, OutputMode, TableRow};

/// Caller-facing switches for one search
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Refresh the index even if it's still fresh
    pub refresh_index: bool,
    /// `None` selects every package in the index
    pub query: Option<String>,
    pub fields: Vec<Field>,
    /// Collapse matches to the single closest name
    pub nearest_match_only: bool,
    pub output_mode: OutputMode,
    /// Look up metadata even if no selected field needs it
    pub metadata_required: bool,
    pub force_metadata_refresh: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            refresh_index: false,
            query: None,
            fields: vec![Field::Name],
            nearest_match_only: false,
            output_mode: OutputMode::Pretty,
            metadata_required: false,
            force_metadata_refresh: false,
        }
    }
}

impl SearchOptions {
    pub fn for_query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    fn needs_metadata(&self, fields: &[Field]) -> bool {
        self.metadata_required || fields.iter().any(Field::needs_metadata)
    }
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Number of rendered records; zero is a normal result
    pub count: usize,
    pub output: String,
    pub index_refreshed: bool,
}

pub struct Searcher<'a, R: Registry> {
    config: &'a Config,
    registry: &'a R,
    matcher: Box<dyn Matcher + 'a>,
    show_progress: bool,
}

impl<'a, R: Registry> Searcher<'a, R> {
    pub fn new(config: &'a Config, registry: &'a R) -> Self {
        Self {
            config,
            registry,
            matcher: Box::new(Substring::default()),
            show_progress: false,
        }
    }

    pub fn with_matcher(mut self, matcher: impl Matcher + 'a) -> Self {
        self.matcher = Box::new(matcher);
        self
    }

    /// Draw spinners and progress bars on a terminal
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub async fn run(&self, options: &SearchOptions) -> Result<SearchOutcome> {
        let index = IndexCache::new(self.config, self.registry);
        let index_refreshed = self.prepare_index(&index, options.refresh_index).await?;

        let query = options.query.as_deref();
        let mut names = match self.select(&index, query) {
            Err(PipfindError::CacheCorruption { path, reason }) => {
                tracing::warn!(path = %path.display(), reason = %reason, "index cache is corrupt, refreshing");
                index.refresh().await?;
                self.select(&index, query)?
            }
            other => other?,
        };
        tracing::debug!(matches = names.len(), query = ?query, "index query finished");

        if let (true, Some(query)) = (options.nearest_match_only, query) {
            names = matcher::nearest_match(&names, query)
                .map(|best| vec![best.to_string()])
                .unwrap_or_default();
        }

        if names.is_empty() {
            return Ok(SearchOutcome {
                count: 0,
                output: String::new(),
                index_refreshed,
            });
        }

        let fields = match table::normalize_fields(&options.fields) {
            fields if fields.is_empty() => vec![Field::Name],
            fields => fields,
        };

        let rows: Vec<TableRow> = if options.needs_metadata(&fields) {
            let metadata = MetadataCache::new(self.config, self.registry);
            let pb = if self.show_progress {
                progress::fetch_progress(names.len())
            } else {
                indicatif::ProgressBar::hidden()
            };
            let records = metadata
                .populate(&names, options.force_metadata_refresh, Some(&pb))
                .await;
            pb.finish_and_clear();
            records.iter().map(|r| table::project(r, &fields)).collect()
        } else {
            names.into_iter().map(|name| vec![name]).collect()
        };

        let count = rows.len();
        let output = table::render(rows, &fields, options.output_mode)?;

        Ok(SearchOutcome {
            count,
            output,
            index_refreshed,
        })
    }

    /// Make sure an index is on disk, preferring a stale one over none.
    async fn prepare_index(&self, index: &IndexCache<'_, R>, force: bool) -> Result<bool> {
        let spinner = if self.show_progress && (force || !index.is_fresh()) {
            progress::spinner("Updating package index...")
        } else {
            indicatif::ProgressBar::hidden()
        };

        let result = if force {
            index.refresh().await.map(|_| true)
        } else {
            index.ensure_fresh().await
        };
        spinner.finish_and_clear();

        match result {
            Ok(refreshed) => Ok(refreshed),
            Err(e) if index.exists() => {
                tracing::warn!(error = %e, "index refresh failed, using cached index");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn select(&self, index: &IndexCache<'_, R>, query: Option<&str>) -> Result<Vec<String>> {
        match query {
            Some(query) => index.query(self.matcher.predicate(query)),
            None => index.entries(),
        }
    }
}
