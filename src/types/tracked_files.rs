//! `TrackedFiles`: absolute paths seen in Write/Edit/MultiEdit tool-use
//! events for one `Invocation`, consulted only to auto-approve `rm` of
//! files the agent itself created during this run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Append-only set of absolute paths. Cheap to snapshot; callers that only
/// need a point-in-time read should clone the returned set rather than hold
/// the guard across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct TrackedFiles {
    paths: HashSet<PathBuf>,
}

impl TrackedFiles {
    /// Create an empty tracked-files set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a path the agent wrote or edited.
    pub fn insert(&mut self, path: impl Into<PathBuf>) {
        self.paths.insert(path.into());
    }

    /// Whether this exact path was tracked.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    /// Whether every one of `paths` is tracked. Empty input is never
    /// considered a match: a rule must name at least one positional path.
    #[must_use]
    pub fn contains_all<'a, I>(&self, paths: I) -> bool
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let mut any = false;
        for path in paths {
            any = true;
            if !self.paths.contains(path) {
                return false;
            }
        }
        any
    }

    /// Point-in-time snapshot for callers that can't hold the guard.
    #[must_use]
    pub fn snapshot(&self) -> HashSet<PathBuf> {
        self.paths.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_never_matches() {
        let tracked = TrackedFiles::new();
        assert!(!tracked.contains_all(Vec::<&Path>::new()));
    }

    #[test]
    fn matches_only_when_all_tracked() {
        let mut tracked = TrackedFiles::new();
        tracked.insert("/tmp/a.txt");
        tracked.insert("/tmp/b.txt");
        let a = PathBuf::from("/tmp/a.txt");
        let b = PathBuf::from("/tmp/b.txt");
        let c = PathBuf::from("/tmp/c.txt");
        assert!(tracked.contains_all([a.as_path(), b.as_path()]));
        assert!(!tracked.contains_all([a.as_path(), c.as_path()]));
    }
}
