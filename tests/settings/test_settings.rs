//! Integration tests for repo-local settings persistence, exercised through
//! the crate's public surface.

use tim_agent_core::settings::{local_settings_path, read_local_rules, repo_identity};

#[test]
fn repo_identity_is_stable_for_the_same_root() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert_eq!(repo_identity(dir.path()), repo_identity(dir.path()));
}

#[test]
fn malformed_settings_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = local_settings_path(dir.path());
    std::fs::create_dir_all(path.parent().unwrap()).expect("mkdir");
    std::fs::write(&path, "not json").expect("write");

    assert!(read_local_rules(dir.path()).is_err());
}
