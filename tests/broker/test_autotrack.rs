//! Integration tests for the `rm`-of-tracked-files auto-approval probe.

use std::path::Path;

use tim_agent_core::broker::auto_approves_rm;
use tim_agent_core::types::TrackedFiles;

#[test]
fn approves_rm_of_exactly_tracked_files() {
    let cwd = Path::new("/work");
    let mut tracked = TrackedFiles::new();
    tracked.insert("/work/scratch.txt");

    assert!(auto_approves_rm("rm scratch.txt", cwd, &tracked));
}

#[test]
fn denies_rm_of_untracked_file() {
    let cwd = Path::new("/work");
    let tracked = TrackedFiles::new();

    assert!(!auto_approves_rm("rm scratch.txt", cwd, &tracked));
}

#[test]
fn denies_rm_with_glob_metacharacters() {
    let cwd = Path::new("/work");
    let mut tracked = TrackedFiles::new();
    tracked.insert("/work/scratch.txt");

    assert!(!auto_approves_rm("rm *.txt", cwd, &tracked));
}

#[test]
fn denies_rm_mixing_a_glob_with_an_otherwise_tracked_path() {
    let cwd = Path::new("/work");
    let mut tracked = TrackedFiles::new();
    tracked.insert("/work/tracked.txt");

    assert!(!auto_approves_rm("rm *.txt tracked.txt", cwd, &tracked));
}

#[test]
fn denies_non_rm_commands() {
    let cwd = Path::new("/work");
    let mut tracked = TrackedFiles::new();
    tracked.insert("/work/scratch.txt");

    assert!(!auto_approves_rm("cat scratch.txt", cwd, &tracked));
}
