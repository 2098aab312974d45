//! Library interface for pipfind
//!
//! Offline search over the PyPI package index. The index and per-package
//! metadata are cached on disk with independent TTLs; searches match names
//! locally and fetch only the metadata they need to render.

pub mod api;
pub mod cache;
pub mod colors;
pub mod config;
pub mod error;
pub mod index;
pub mod matcher;
pub mod metadata;
pub mod progress;
pub mod search;
pub mod table;

// Re-export commonly used types
pub use api::{ProjectDocument, ProjectInfo, PypiApi, Registry};
pub use config::{Clock, Config};
pub use error::{PipfindError, Result};
pub use index::IndexCache;
pub use matcher::{Matcher, Prefix, Substring, edit_distance, nearest_match};
pub use metadata::{MetadataCache, MetadataRecord, Provenance};
pub use search::{SearchOptions, SearchOutcome, Searcher};
pub use table::{Field, OutputMode, TableRow};
