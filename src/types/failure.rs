//! Failure reporting: emitted when an assistant's raw text contains a line
//! beginning `FAILED:`.

use serde::{Deserialize, Serialize};

/// Which role in a multi-agent flow produced a failure report, inferred
/// from the failure summary text by substring priority match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceAgent {
    Implementer,
    Tester,
    Verifier,
    #[serde(rename = "tdd-tests")]
    TddTests,
    Reviewer,
    Review,
    Orchestrator,
}

impl SourceAgent {
    /// Infer the source agent from a failure summary, checking substrings in
    /// priority order (reviewer, verifier, tester, tdd-tests, implementer):
    /// the first matching substring wins. Defaults to `Orchestrator` when
    /// nothing matches.
    #[must_use]
    pub fn infer_from_summary(summary: &str) -> Self {
        let lower = summary.to_lowercase();
        const ORDER: &[(&str, SourceAgent)] = &[
            ("reviewer", SourceAgent::Reviewer),
            ("verifier", SourceAgent::Verifier),
            ("tester", SourceAgent::Tester),
            ("tdd-tests", SourceAgent::TddTests),
            ("implementer", SourceAgent::Implementer),
            ("review", SourceAgent::Review),
        ];
        for (needle, agent) in ORDER {
            if lower.contains(needle) {
                return *agent;
            }
        }
        SourceAgent::Orchestrator
    }
}

impl Default for SourceAgent {
    fn default() -> Self {
        Self::Orchestrator
    }
}

/// A parsed `FAILED:` report extracted from an assistant message's raw text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FailureReport {
    /// The one-line summary following `FAILED:`.
    pub summary: String,
    /// Which agent role this failure is attributed to.
    pub source_agent: SourceAgent,
    /// Lines under a `Requirements:` subsection, if present.
    #[serde(default)]
    pub requirements: Vec<String>,
    /// Lines under a `Problems:` subsection, if present.
    #[serde(default)]
    pub problems: Vec<String>,
    /// Lines under a `Possible solutions:` subsection, if present.
    #[serde(default)]
    pub possible_solutions: Vec<String>,
}

impl FailureReport {
    /// Build a report from a summary, inferring `source_agent` and leaving
    /// the subsection lists empty. Callers fill in subsections separately
    /// once they've located them in the raw text.
    #[must_use]
    pub fn new(summary: impl Into<String>) -> Self {
        let summary = summary.into();
        let source_agent = SourceAgent::infer_from_summary(&summary);
        Self {
            summary,
            source_agent,
            requirements: Vec::new(),
            problems: Vec::new(),
            possible_solutions: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_tester_before_implementer() {
        let agent = SourceAgent::infer_from_summary("implementer could not satisfy tester checks");
        assert_eq!(agent, SourceAgent::Tester);
    }

    #[test]
    fn defaults_to_orchestrator() {
        let agent = SourceAgent::infer_from_summary("build is broken");
        assert_eq!(agent, SourceAgent::Orchestrator);
    }

    #[test]
    fn plain_implementer_match() {
        let agent = SourceAgent::infer_from_summary("implementer left a stub");
        assert_eq!(agent, SourceAgent::Implementer);
    }

    #[test]
    fn reviewer_outranks_review() {
        let agent = SourceAgent::infer_from_summary("reviewer rejected the review");
        assert_eq!(agent, SourceAgent::Reviewer);
    }
}
