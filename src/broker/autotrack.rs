//! The `rm`-of-agent-created-files auto-approval probe.

use std::path::{Path, PathBuf};

use crate::types::TrackedFiles;

/// Whether `command` is an `rm` invocation whose positional arguments
/// (ignoring flags and glob-bearing tokens), resolved relative to `cwd`,
/// form a non-empty set of paths every one of which is in `tracked`.
///
/// Tokenization uses POSIX-ish quoting (`shlex`): single quotes suppress
/// escaping, double quotes don't, backslash escapes outside single quotes.
#[must_use]
pub fn auto_approves_rm(command: &str, cwd: &Path, tracked: &TrackedFiles) -> bool {
    let Some(tokens) = shlex::split(command) else {
        return false;
    };

    let Some((head, rest)) = tokens.split_first() else {
        return false;
    };
    if head != "rm" {
        return false;
    }

    let positional: Vec<&String> = rest.iter().filter(|tok| !tok.starts_with('-')).collect();

    if positional.iter().any(|tok| has_glob_metachars(tok)) {
        return false;
    }

    let paths: Vec<PathBuf> = positional.iter().map(|tok| resolve(cwd, tok)).collect();

    !paths.is_empty() && tracked.contains_all(paths.iter().map(PathBuf::as_path))
}

fn has_glob_metachars(token: &str) -> bool {
    token.contains(['*', '?', '[', ']'])
}

fn resolve(cwd: &Path, token: &str) -> PathBuf {
    let path = Path::new(token);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approves_rm_of_tracked_file() {
        let mut tracked = TrackedFiles::new();
        tracked.insert("/work/scratch.txt");
        assert!(auto_approves_rm("rm scratch.txt", Path::new("/work"), &tracked));
    }

    #[test]
    fn rejects_untracked_file() {
        let tracked = TrackedFiles::new();
        assert!(!auto_approves_rm("rm scratch.txt", Path::new("/work"), &tracked));
    }

    #[test]
    fn rejects_glob_arguments() {
        let mut tracked = TrackedFiles::new();
        tracked.insert("/work/a.txt");
        assert!(!auto_approves_rm("rm *.txt", Path::new("/work"), &tracked));
    }

    #[test]
    fn rejects_non_rm_commands() {
        let mut tracked = TrackedFiles::new();
        tracked.insert("/work/a.txt");
        assert!(!auto_approves_rm("cat a.txt", Path::new("/work"), &tracked));
    }

    #[test]
    fn rejects_partial_coverage() {
        let mut tracked = TrackedFiles::new();
        tracked.insert("/work/a.txt");
        assert!(!auto_approves_rm("rm a.txt b.txt", Path::new("/work"), &tracked));
    }

    #[test]
    fn rejects_when_any_argument_is_a_glob_even_if_others_are_tracked() {
        let mut tracked = TrackedFiles::new();
        tracked.insert("/work/tracked.txt");
        assert!(!auto_approves_rm("rm *.txt tracked.txt", Path::new("/work"), &tracked));
    }

    #[test]
    fn ignores_flags() {
        let mut tracked = TrackedFiles::new();
        tracked.insert("/work/a.txt");
        assert!(auto_approves_rm("rm -f a.txt", Path::new("/work"), &tracked));
    }
}
