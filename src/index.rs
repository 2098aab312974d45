//! Bulk package-name index, cached on disk as one name per line.
//!
//! The cache is valid while `index.txt` exists and is no older than the
//! configured index TTL. A refresh only replaces the file after the remote
//! listing has been fetched and parsed into at least one name, so a failed
//! or empty download leaves the previous index in place.

use crate::api::Registry;
use crate::cache;
use crate::config::{Clock, Config};
use crate::error::{PipfindError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub struct IndexCache<'a, R: Registry> {
    registry: &'a R,
    path: PathBuf,
    ttl: Duration,
    clock: Clock,
}

impl<'a, R: Registry> IndexCache<'a, R> {
    pub fn new(config: &Config, registry: &'a R) -> Self {
        Self {
            registry,
            path: config.index_path(),
            ttl: config.ttl_index,
            clock: config.clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn is_fresh(&self) -> bool {
        cache::is_fresh(&self.path, self.ttl, self.clock.now())
    }

    /// Refresh the index if it's missing or older than the TTL.
    ///
    /// Returns `true` when a refresh happened.
    pub async fn ensure_fresh(&self) -> Result<bool> {
        if self.is_fresh() {
            tracing::debug!(path = %self.path.display(), "package index is fresh");
            return Ok(false);
        }

        match cache::age_of(&self.path, self.clock.now()) {
            Some(age) => tracing::info!(age_secs = age.as_secs(), "package index is stale"),
            None => tracing::info!("no package index cached yet"),
        }

        self.refresh().await?;
        Ok(true)
    }

    /// Download the full listing and atomically replace the cached index.
    ///
    /// Returns the number of names written.
    pub async fn refresh(&self) -> Result<usize> {
        let document = self.registry.fetch_index().await?;
        let names = parse_listing(&document);

        if names.is_empty() {
            return Err(PipfindError::fetch(
                self.path.display().to_string(),
                "index listing contained no package names",
            ));
        }

        let mut contents = names.join("\n");
        contents.push('\n');
        cache::write_atomic(&self.path, contents.as_bytes())?;

        tracing::info!(entries = names.len(), path = %self.path.display(), "package index refreshed");
        Ok(names.len())
    }

    /// All cached names in listing order.
    pub fn entries(&self) -> Result<Vec<String>> {
        let bytes = std::fs::read(&self.path)?;
        let content = String::from_utf8(bytes).map_err(|e| PipfindError::CacheCorruption {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    /// Names satisfying `predicate`, in listing order.
    pub fn query<P>(&self, predicate: P) -> Result<Vec<String>>
    where
        P: Fn(&str) -> bool,
    {
        let mut entries = self.entries()?;
        entries.retain(|name| predicate(name));
        Ok(entries)
    }
}

/// Extract package names from a simple-index document.
///
/// Names are the text of each `<a ...>name</a>` anchor, so the page header
/// and any other markup fall away. A document with no anchors is read as a
/// plain newline-delimited list. Duplicates keep their first position.
pub fn parse_listing(document: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    let mut push = |name: &str| {
        let name = name.trim();
        if !name.is_empty() && seen.insert(name.to_string()) {
            names.push(name.to_string());
        }
    };

    let mut found_anchor = false;
    let mut rest = document;
    while let Some(start) = find_anchor_open(rest) {
        let after_open = &rest[start..];
        let Some(tag_end) = after_open.find('>') else {
            break;
        };
        let body = &after_open[tag_end + 1..];
        let Some(close) = body.find("</a>") else {
            break;
        };
        found_anchor = true;
        push(&strip_tags(&body[..close]));
        rest = &body[close + 4..];
    }

    if !found_anchor {
        for line in document.lines() {
            if !line.contains('<') {
                push(line);
            }
        }
    }

    names
}

fn find_anchor_open(s: &str) -> Option<usize> {
    let mut offset = 0;
    while let Some(pos) = s[offset..].find("<a") {
        let idx = offset + pos;
        match s[idx + 2..].chars().next() {
            Some(c) if c == '>' || c.is_whitespace() => return Some(idx),
            _ => offset = idx + 2,
        }
    }
    None
}

fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}
