//! The `FAILED:` scanner: a failure-detection pass over an assistant
//! message's concatenated raw text.

use crate::types::{FailureReport, SourceAgent};

const REQUIREMENTS_HEADER: &str = "requirements:";
const PROBLEMS_HEADER: &str = "problems:";
const POSSIBLE_SOLUTIONS_HEADER: &str = "possible solutions:";

/// Scan `raw_text` line-by-line for the first line beginning `FAILED:`
/// (whitespace-tolerant), then parse any canonical `Requirements:`/
/// `Problems:`/`Possible solutions:` subsections that follow into bulleted
/// string lists. Returns `None` if no `FAILED:` line is present anywhere in
/// the text; the failure survives even if it's not on the first line of the
/// message.
#[must_use]
pub fn detect_failure(raw_text: &str) -> Option<FailureReport> {
    let lines: Vec<&str> = raw_text.lines().collect();

    let (failed_index, summary) = lines.iter().enumerate().find_map(|(i, line)| {
        let trimmed = line.trim_start();
        trimmed
            .strip_prefix("FAILED:")
            .map(|rest| (i, rest.trim().to_string()))
    })?;

    let mut report = FailureReport::new(summary);
    parse_sections(&lines[failed_index + 1..], &mut report);
    Some(report)
}

fn parse_sections(lines: &[&str], report: &mut FailureReport) {
    let mut current: Option<&mut Vec<String>> = None;

    for line in lines {
        let trimmed = line.trim();
        let lower = trimmed.to_lowercase();

        if lower == REQUIREMENTS_HEADER {
            current = Some(&mut report.requirements);
            continue;
        }
        if lower == PROBLEMS_HEADER {
            current = Some(&mut report.problems);
            continue;
        }
        if lower == POSSIBLE_SOLUTIONS_HEADER {
            current = Some(&mut report.possible_solutions);
            continue;
        }

        if trimmed.is_empty() {
            continue;
        }

        if let Some(bullet) = trimmed.strip_prefix('-').or_else(|| trimmed.strip_prefix('*')) {
            if let Some(ref mut list) = current {
                list.push(bullet.trim().to_string());
            }
        } else {
            // A non-bullet, non-header, non-blank line ends the current
            // subsection (it's prose outside the canonical lists).
            current = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_buried_failure_with_sections() {
        let text = "PREFACE\nSome lines first\n\nFAILED: Could not proceed due to constraints\nProblems:\n- X";
        let report = detect_failure(text).expect("failure detected");
        assert_eq!(report.summary, "Could not proceed due to constraints");
        assert_eq!(report.problems, vec!["X".to_string()]);
        assert_eq!(report.source_agent, SourceAgent::Orchestrator);
    }

    #[test]
    fn absence_of_failed_yields_none() {
        assert!(detect_failure("everything is fine\nno issues here").is_none());
    }

    #[test]
    fn parses_all_three_sections() {
        let text = "FAILED: tester reports a regression\n\
Requirements:\n- req one\n- req two\n\
Problems:\n- prob one\n\
Possible solutions:\n- fix a\n- fix b\n";
        let report = detect_failure(text).expect("failure detected");
        assert_eq!(report.requirements, vec!["req one", "req two"]);
        assert_eq!(report.problems, vec!["prob one"]);
        assert_eq!(report.possible_solutions, vec!["fix a", "fix b"]);
        assert_eq!(report.source_agent, SourceAgent::Tester);
    }

    #[test]
    fn whitespace_tolerant_prefix() {
        let report = detect_failure("   FAILED: indented failure line").expect("detected");
        assert_eq!(report.summary, "indented failure line");
    }
}
