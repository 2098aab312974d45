//! Name matching over the package index.
//!
//! A [`Matcher`] decides which index entries a query selects. The default is
//! a case-insensitive substring scan; [`Prefix`] is the alternative. When only
//! one result is wanted, [`nearest_match`] collapses the matches to the name
//! with the smallest Levenshtein distance to the query.

/// Capability for selecting names from the index.
pub trait Matcher: Send + Sync {
    /// Build a name predicate for `query`.
    fn predicate<'a>(&'a self, query: &'a str) -> Box<dyn Fn(&str) -> bool + 'a>;

    /// All names in `corpus` selected by `query`, in corpus order.
    fn matches(&self, query: &str, corpus: &[String]) -> Vec<String> {
        let predicate = self.predicate(query);
        corpus.iter().filter(|name| predicate(name)).cloned().collect()
    }
}

/// Names containing the query
#[derive(Debug, Clone, Copy, Default)]
pub struct Substring {
    pub case_sensitive: bool,
}

impl Matcher for Substring {
    fn predicate<'a>(&'a self, query: &'a str) -> Box<dyn Fn(&str) -> bool + 'a> {
        if self.case_sensitive {
            Box::new(move |name: &str| name.contains(query))
        } else {
            let query = query.to_lowercase();
            Box::new(move |name: &str| name.to_lowercase().contains(&query))
        }
    }
}

/// Names starting with the query
#[derive(Debug, Clone, Copy, Default)]
pub struct Prefix {
    pub case_sensitive: bool,
}

impl Matcher for Prefix {
    fn predicate<'a>(&'a self, query: &'a str) -> Box<dyn Fn(&str) -> bool + 'a> {
        if self.case_sensitive {
            Box::new(move |name: &str| name.starts_with(query))
        } else {
            let query = query.to_lowercase();
            Box::new(move |name: &str| name.to_lowercase().starts_with(&query))
        }
    }
}

/// Case-insensitive substring search, the default matching rule.
pub fn search(entries: &[String], query: &str) -> Vec<String> {
    Substring::default().matches(query, entries)
}

/// Levenshtein distance between `a` and `b`, counted in chars.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Two rows of the DP table, indexed by position in b
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            let deletion = prev[j + 1] + 1;
            let insertion = curr[j] + 1;
            curr[j + 1] = substitution.min(deletion).min(insertion);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// The candidate closest to `query` by edit distance.
///
/// Ties go to the earliest candidate. Returns `None` for an empty slice.
pub fn nearest_match<'a, S: AsRef<str>>(candidates: &'a [S], query: &str) -> Option<&'a str> {
    let mut best: Option<(usize, &str)> = None;

    for candidate in candidates {
        let candidate = candidate.as_ref();
        let distance = edit_distance(candidate, query);
        match best {
            Some((best_distance, _)) if distance >= best_distance => {}
            _ => best = Some((distance, candidate)),
        }
        if distance == 0 {
            break;
        }
    }

    best.map(|(_, name)| name)
}
