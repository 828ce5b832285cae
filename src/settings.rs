//! Repo-local permission settings (`.claude/settings.local.json`) and the
//! shared cross-project rule store contract.
//!
//! Persistence failures here are logged but never change the approval
//! result they're attached to.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TimError};
use crate::types::RuleMap;

/// Shape of `.claude/settings.local.json`, trimmed to the one section this
/// crate reads and writes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    permissions: Option<PermissionsSection>,

    /// Any other top-level keys already present in the file. Preserved
    /// round-trip so a write from this crate never clobbers unrelated
    /// settings a human or another tool put there.
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PermissionsSection {
    #[serde(default)]
    allow: Vec<String>,

    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

/// Path to `.claude/settings.local.json` under a project root.
#[must_use]
pub fn local_settings_path(project_root: &Path) -> PathBuf {
    project_root.join(".claude").join("settings.local.json")
}

/// Read the repo-local allow rules. Missing file or missing section both
/// yield an empty map; only a malformed-but-present file is an error.
pub fn read_local_rules(project_root: &Path) -> Result<RuleMap> {
    let path = local_settings_path(project_root);
    if !path.exists() {
        return Ok(RuleMap::new());
    }
    let contents = std::fs::read_to_string(&path).map_err(TimError::Io)?;
    let parsed: SettingsFile = serde_json::from_str(&contents)
        .map_err(|e| TimError::settings(format!("{}: {e}", path.display())))?;
    let allow = parsed.permissions.map(|p| p.allow).unwrap_or_default();
    Ok(RuleMap::from_allow_strings(allow))
}

/// Append one rule to the repo-local settings file, creating the file and
/// its parent directory if absent. Idempotent: re-adding an existing entry
/// is a no-op. A present-but-malformed file is overwritten with a fresh
/// skeleton rather than aborting the write.
pub fn persist_local_rule(project_root: &Path, rule: &str) -> Result<()> {
    let path = local_settings_path(project_root);
    let mut file: SettingsFile = if path.exists() {
        let contents = std::fs::read_to_string(&path).map_err(TimError::Io)?;
        match serde_json::from_str(&contents) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::debug!(
                    "settings: {} is malformed ({e}), overwriting with a fresh skeleton",
                    path.display()
                );
                SettingsFile::default()
            }
        }
    } else {
        SettingsFile::default()
    };

    let section = file.permissions.get_or_insert_with(PermissionsSection::default);
    if !section.allow.iter().any(|existing| existing == rule) {
        section.allow.push(rule.to_string());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(TimError::Io)?;
    }
    let serialized = serde_json::to_string_pretty(&file).map_err(TimError::JsonDecode)?;
    std::fs::write(&path, serialized).map_err(TimError::Io)?;
    Ok(())
}

/// Contract for the cross-worktree shared-permissions store keyed by
/// repository identity. The real store lives outside this crate's scope;
/// only its read/write surface is modeled here.
pub trait SharedRuleStore: Send + Sync {
    /// Return previously persisted rules for the given repository identity.
    fn rules_for(&self, repo_identity: &str) -> Result<Vec<String>>;

    /// Persist one rule under the given repository identity.
    fn persist(&self, repo_identity: &str, rule: &str) -> Result<()>;
}

/// In-memory stand-in used when no real shared store is configured.
/// Rules persisted through it live only as long as the process.
#[derive(Debug, Default)]
pub struct NullSharedRuleStore;

impl SharedRuleStore for NullSharedRuleStore {
    fn rules_for(&self, _repo_identity: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn persist(&self, _repo_identity: &str, _rule: &str) -> Result<()> {
        Ok(())
    }
}

/// Derive a stable repository identity for the shared store from a
/// project root, using the canonicalized path as a conservative default.
pub fn repo_identity(project_root: &Path) -> String {
    project_root
        .canonicalize()
        .unwrap_or_else(|_| project_root.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_empty_rules() {
        let dir = tempfile::tempdir().expect("tempdir");
        let rules = read_local_rules(dir.path()).expect("read");
        assert!(!rules.is_approved("Edit", None));
    }

    #[test]
    fn persist_then_read_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        persist_local_rule(dir.path(), "Edit").expect("persist");
        persist_local_rule(dir.path(), "Bash(git status)").expect("persist");
        let rules = read_local_rules(dir.path()).expect("read");
        assert!(rules.is_approved("Edit", None));
        assert!(rules.is_approved("Bash", Some("git status --short")));
    }

    #[test]
    fn persist_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        persist_local_rule(dir.path(), "Edit").expect("persist");
        persist_local_rule(dir.path(), "Edit").expect("persist");
        let path = local_settings_path(dir.path());
        let contents = std::fs::read_to_string(path).expect("read file");
        assert_eq!(contents.matches("\"Edit\"").count(), 1);
    }

    #[test]
    fn persist_overwrites_malformed_file_with_fresh_skeleton() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = local_settings_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).expect("mkdir");
        std::fs::write(&path, "{ not json at all").expect("write garbage");

        persist_local_rule(dir.path(), "Edit").expect("persist recovers from malformed file");

        let rules = read_local_rules(dir.path()).expect("read");
        assert!(rules.is_approved("Edit", None));
    }

    #[test]
    fn null_shared_store_is_a_no_op() {
        let store = NullSharedRuleStore;
        assert!(store.rules_for("example/repo").unwrap().is_empty());
        store.persist("example/repo", "Edit").expect("persist");
    }
}
