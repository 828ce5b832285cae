//! Integration tests for the allow-rule data model's merge monotonicity:
//! approvals are never removed by a merge.

use tim_agent_core::types::RuleMap;

#[test]
fn merge_never_removes_an_existing_approval() {
    let mut base = RuleMap::from_allow_strings(["Edit"]);
    let incoming = RuleMap::new();

    base.merge(&incoming);

    assert!(base.is_approved("Edit", None));
}

#[test]
fn merge_unions_bash_prefixes_from_both_sides() {
    let mut base = RuleMap::from_allow_strings(["Bash(git status)"]);
    let incoming = RuleMap::from_allow_strings(["Bash(git diff)"]);

    base.merge(&incoming);

    assert!(base.is_approved("Bash", Some("git status --short")));
    assert!(base.is_approved("Bash", Some("git diff --stat")));
    assert!(!base.is_approved("Bash", Some("git push")));
}

#[test]
fn allow_all_wins_over_a_narrower_prefix_list() {
    let mut base = RuleMap::from_allow_strings(["Bash(git status)"]);
    let incoming = RuleMap::from_allow_strings(["Bash"]);

    base.merge(&incoming);

    assert!(base.is_approved("Bash", Some("anything at all")));
}
