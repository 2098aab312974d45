//! Runtime configuration shared by every cache component.
//!
//! A [`Config`] is resolved once at startup and handed to each component at
//! construction. Nothing downstream reads the environment or the wall clock
//! directly: cache locations, TTLs and the "now" timestamp all come from here,
//! which is what lets tests pin time and redirect the cache into a temp dir.
//!
//! # Environment overrides
//!
//! | Variable | Meaning |
//! |---|---|
//! | `PIPFIND_CACHE_DIR` | cache root (default `$XDG_CACHE_HOME/pipfind`) |
//! | `PIPFIND_INDEX_URL` | simple index listing URL |
//! | `PIPFIND_METADATA_URL` | base URL for `<base>/<name>/json` |
//! | `PIPFIND_INDEX_TTL` | index TTL in seconds |
//! | `PIPFIND_META_TTL` | metadata TTL in seconds |
//! | `PIPFIND_JOBS` | parallel metadata fetches |
//! | `PIPFIND_TIMEOUT` | per-request timeout in seconds (unset = none) |

use crate::error::{PipfindError, Result};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

pub const DEFAULT_INDEX_URL: &str = "https://pypi.org/simple/";
pub const DEFAULT_METADATA_URL: &str = "https://pypi.org/pypi";
pub const DEFAULT_TTL: Duration = Duration::from_secs(604_800); // 7 days

/// Source of the "now" timestamp used for staleness checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(SystemTime),
}

impl Clock {
    pub fn now(&self) -> SystemTime {
        match self {
            Clock::System => SystemTime::now(),
            Clock::Fixed(t) => *t,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub cache_dir: PathBuf,
    pub index_url: String,
    pub metadata_base_url: String,
    pub ttl_index: Duration,
    pub ttl_meta: Duration,
    /// Degree of parallelism for metadata population
    pub jobs: usize,
    /// `None` means requests may block indefinitely
    pub request_timeout: Option<Duration>,
    pub clock: Clock,
}

impl Config {
    /// Defaults rooted at an explicit cache directory.
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            index_url: DEFAULT_INDEX_URL.to_string(),
            metadata_base_url: DEFAULT_METADATA_URL.to_string(),
            ttl_index: DEFAULT_TTL,
            ttl_meta: DEFAULT_TTL,
            jobs: default_jobs(),
            request_timeout: None,
            clock: Clock::System,
        }
    }

    /// Resolve configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cache_dir = match lookup("PIPFIND_CACHE_DIR") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => default_cache_dir(&lookup),
        };

        let mut config = Self::with_cache_dir(cache_dir);

        if let Some(url) = lookup("PIPFIND_INDEX_URL") {
            config.index_url = url;
        }
        if let Some(url) = lookup("PIPFIND_METADATA_URL") {
            config.metadata_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = lookup("PIPFIND_INDEX_TTL") {
            config.ttl_index = Duration::from_secs(parse_number("PIPFIND_INDEX_TTL", &secs)?);
        }
        if let Some(secs) = lookup("PIPFIND_META_TTL") {
            config.ttl_meta = Duration::from_secs(parse_number("PIPFIND_META_TTL", &secs)?);
        }
        if let Some(jobs) = lookup("PIPFIND_JOBS") {
            let jobs = parse_number("PIPFIND_JOBS", &jobs)?;
            if jobs == 0 {
                return Err(PipfindError::Configuration(
                    "PIPFIND_JOBS must be at least 1".to_string(),
                ));
            }
            config.jobs = jobs as usize;
        }
        if let Some(secs) = lookup("PIPFIND_TIMEOUT") {
            config.request_timeout =
                Some(Duration::from_secs(parse_number("PIPFIND_TIMEOUT", &secs)?));
        }

        Ok(config)
    }

    pub fn index_path(&self) -> PathBuf {
        self.cache_dir.join("index.txt")
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.cache_dir.join("meta")
    }

    pub fn now(&self) -> SystemTime {
        self.clock.now()
    }
}

/// `$XDG_CACHE_HOME/pipfind`, falling back to `$HOME/.cache/pipfind`
fn default_cache_dir<F>(lookup: &F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(cache_home) = lookup("XDG_CACHE_HOME").filter(|v| !v.is_empty()) {
        PathBuf::from(cache_home).join("pipfind")
    } else if let Some(home) = lookup("HOME").filter(|v| !v.is_empty()) {
        PathBuf::from(home).join(".cache/pipfind")
    } else {
        PathBuf::from(".cache/pipfind")
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value.trim().parse::<u64>().map_err(|_| {
        PipfindError::Configuration(format!("{} must be a whole number, got '{}'", key, value))
    })
}
