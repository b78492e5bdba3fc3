//! Item eligibility filter
//!
//! Pure predicate over `(path, name, size)` deciding whether a drive item is
//! mirrored. Rules are applied in a fixed order; the first failing rule wins:
//!
//! 1. size cap
//! 2. extension allow-list (when non-empty)
//! 3. extension deny-list
//! 4. path-prefix allow-list, matching at path boundaries only
//! 5. glob patterns, first-match-wins; a leading `!` makes a pattern an
//!    exclusion, and an item matching no pattern at all is rejected

use glob::Pattern;

use crate::config::SyncConfig;
use crate::error::SyncError;

/// Why an item was rejected. Used for logging and the `skipped` counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Larger than `sync.max_file_size_mb`
    TooLarge,
    /// Extension absent from the non-empty allow-list
    ExtensionNotIncluded,
    /// Extension present in the deny-list
    ExtensionExcluded,
    /// Path not under any `include_paths` prefix
    PathNotIncluded,
    /// First matching glob pattern was an exclusion
    PatternExcluded,
    /// Patterns configured but none matched
    NoPatternMatched,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::TooLarge => "too_large",
            RejectReason::ExtensionNotIncluded => "extension_not_included",
            RejectReason::ExtensionExcluded => "extension_excluded",
            RejectReason::PathNotIncluded => "path_not_included",
            RejectReason::PatternExcluded => "pattern_excluded",
            RejectReason::NoPatternMatched => "no_pattern_matched",
        }
    }
}

/// Outcome of a filter evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Accept,
    Reject(RejectReason),
}

impl FilterDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, FilterDecision::Accept)
    }
}

/// Compiled eligibility filter.
///
/// Construction compiles the glob patterns once; evaluation is pure and
/// allocation-free apart from extension lowercasing.
#[derive(Debug)]
pub struct SyncFilter {
    max_size_bytes: u64,
    include_extensions: Vec<String>,
    exclude_extensions: Vec<String>,
    include_paths: Vec<String>,
    /// `(negated, pattern)` in configuration order
    patterns: Vec<(bool, Pattern)>,
}

impl SyncFilter {
    /// Compile a filter from the sync configuration section.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Config` when a glob pattern does not compile.
    pub fn from_config(sync: &SyncConfig) -> Result<Self, SyncError> {
        let mut patterns = Vec::with_capacity(sync.path_patterns.len());
        for raw in &sync.path_patterns {
            let (negated, source) = match raw.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, raw.as_str()),
            };
            let pattern = Pattern::new(source).map_err(|e| {
                SyncError::Config(format!("invalid path pattern '{raw}': {e}"))
            })?;
            patterns.push((negated, pattern));
        }

        Ok(Self {
            max_size_bytes: sync.max_file_size_mb * 1024 * 1024,
            include_extensions: lowercased(&sync.include_extensions),
            exclude_extensions: lowercased(&sync.exclude_extensions),
            include_paths: sync
                .include_paths
                .iter()
                .map(|p| p.trim_end_matches('/').to_string())
                .collect(),
            patterns,
        })
    }

    /// Evaluate the filter for one item.
    ///
    /// `path` is the server-reported absolute path within the drive and
    /// `name` the file name; `size` is the server-reported byte count.
    pub fn evaluate(&self, path: &str, name: &str, size: u64) -> FilterDecision {
        if size > self.max_size_bytes {
            return FilterDecision::Reject(RejectReason::TooLarge);
        }

        let ext = extension_of(name);

        if !self.include_extensions.is_empty()
            && !self.include_extensions.iter().any(|e| e == &ext)
        {
            return FilterDecision::Reject(RejectReason::ExtensionNotIncluded);
        }

        if self.exclude_extensions.iter().any(|e| e == &ext) {
            return FilterDecision::Reject(RejectReason::ExtensionExcluded);
        }

        if !self.include_paths.is_empty()
            && !self.include_paths.iter().any(|p| path_has_prefix(path, p))
        {
            return FilterDecision::Reject(RejectReason::PathNotIncluded);
        }

        if !self.patterns.is_empty() {
            for (negated, pattern) in &self.patterns {
                if pattern.matches(path) {
                    return if *negated {
                        FilterDecision::Reject(RejectReason::PatternExcluded)
                    } else {
                        FilterDecision::Accept
                    };
                }
            }
            return FilterDecision::Reject(RejectReason::NoPatternMatched);
        }

        FilterDecision::Accept
    }
}

/// Lowercased extension of `name` without the dot; empty when there is none.
fn extension_of(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// Prefix match at a path boundary: equal, or followed by `/`.
fn path_has_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}

fn lowercased(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim_start_matches('.').to_ascii_lowercase())
        .collect()
}
