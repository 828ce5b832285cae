//! Integration-level coverage of failure detection via the crate's public
//! surface (unit coverage of the section parser lives alongside the code).

use tim_agent_core::formatter::detect_failure;
use tim_agent_core::types::SourceAgent;

#[test]
fn infers_reviewer_as_source_agent() {
    let text = "FAILED: reviewer rejected the change\nProblems:\n- missing test coverage";
    let report = detect_failure(text).expect("failure detected");
    assert_eq!(report.source_agent, SourceAgent::Reviewer);
    assert_eq!(report.problems, vec!["missing test coverage".to_string()]);
}

#[test]
fn clean_output_has_no_failure() {
    assert!(detect_failure("Implemented the feature.\nAll tests pass.").is_none());
}
