//! Orchestration-Prompt Renderer.
//!
//! Pure `(contextText, planId, mode, options) -> String` assembly, no I/O.
//! `ExecutionMode` carries the TDD/normal/review distinction; `simpleMode`
//! on `OrchestrationOptions` distinguishes simple from normal since the two
//! share an `ExecutionMode` value at the CLI-dialect level.

use crate::types::orchestration::{ExecutionMode, OrchestrationOptions, SubagentExecutor};

const DEFAULT_EXECUTOR_SELECTION_TEXT: &str =
    "Pick whichever subagent executor (codex-cli or claude-code) is available in this \
     environment, and use it consistently for every delegated call in this run.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variant {
    Normal,
    Simple,
    Tdd,
}

fn variant_for(mode: ExecutionMode, options: &OrchestrationOptions) -> Variant {
    if mode == ExecutionMode::Tdd {
        Variant::Tdd
    } else if options.simple_mode {
        Variant::Simple
    } else {
        Variant::Normal
    }
}

/// Render the orchestration prompt for one Invocation.
#[must_use]
pub fn render_orchestration_prompt(
    context_text: &str,
    plan_id: &str,
    mode: ExecutionMode,
    options: &OrchestrationOptions,
) -> String {
    let variant = variant_for(mode, options);

    let mut sections = vec![header_section(variant), context_section(context_text)];
    if options.batch_mode {
        sections.push(batch_mode_section(plan_id));
    }
    sections.push(available_agents_section(variant, options));
    sections.push(workflow_phases_section(variant, options.batch_mode));
    sections.push(failure_protocol_section());
    sections.push(progress_updates_section(plan_id));
    sections.push(important_guidelines_section());

    sections.join("\n\n")
}

fn header_section(variant: Variant) -> String {
    let label = match variant {
        Variant::Normal => "Normal",
        Variant::Simple => "Simple",
        Variant::Tdd => "TDD",
    };
    format!("# Orchestration Prompt ({label} mode)")
}

fn context_section(context_text: &str) -> String {
    format!("## Context\n\n{context_text}")
}

fn batch_mode_section(plan_id: &str) -> String {
    format!(
        "## Batch Mode\n\n\
         Select 2-5 related, currently-unblocked tasks from plan `{plan_id}` to work on \
         together this iteration. After completing them, update the plan file with:\n\n\
         ```yaml\n\
         tasks:\n  \
         - id: <task-id>\n    \
         status: completed\n\
         ```\n\n\
         Prefer tasks that share files or context to minimize redundant reads."
    )
}

fn available_agents_section(variant: Variant, options: &OrchestrationOptions) -> String {
    let executor_flag = if options.wants_explicit_executor_flag() {
        match options.subagent_executor {
            SubagentExecutor::CodexCli => " -x codex-cli",
            SubagentExecutor::ClaudeCode => " -x claude-code",
            SubagentExecutor::Dynamic => "",
        }
    } else {
        ""
    };

    let agents: &[&str] = match variant {
        Variant::Normal => &["implementer", "tester"],
        Variant::Simple => &["implementer", "verifier"],
        Variant::Tdd => &["tdd-tests", "implementer", "tester", "verifier"],
    };

    let mut s = String::from("## Available Agents\n\n");
    for agent in agents {
        s.push_str(&format!("- `tim subagent {agent}{executor_flag} <prompt>`\n"));
    }
    if variant != Variant::Simple {
        s.push_str("- `tim review <prompt>` for the review phase\n");
    }

    if options.wants_executor_selection_block() {
        s.push_str("\n### Executor Selection\n\n");
        s.push_str(
            options
                .dynamic_subagent_instructions
                .as_deref()
                .unwrap_or(DEFAULT_EXECUTOR_SELECTION_TEXT),
        );
    }

    s
}

fn workflow_phases_section(variant: Variant, batch_mode: bool) -> String {
    let mut phases = Vec::new();
    if batch_mode {
        phases.push("Task Selection");
    }
    if variant == Variant::Tdd {
        phases.push("TDD Test Phase");
    }
    phases.push("Implementation");
    phases.push(if variant == Variant::Simple { "Verification" } else { "Testing" });
    if variant != Variant::Simple {
        phases.push("Review");
    }
    phases.push("Notes");
    phases.push("Iteration");

    let mut s = String::from("## Workflow Phases\n\n");
    for (i, phase) in phases.iter().enumerate() {
        s.push_str(&format!("{}. {phase}\n", i + 1));
    }
    s
}

fn failure_protocol_section() -> String {
    "## Failure Protocol\n\n\
     If any subagent's output contains a line beginning `FAILED:`, halt orchestration \
     immediately. Do not start further phases or dispatch further subagents. Propagate a \
     line formatted exactly as:\n\n\
     ```\n\
     FAILED: <agent> reported a failure — <summary>\n\
     ```\n\n\
     followed by the subagent's report verbatim."
        .to_string()
}

fn progress_updates_section(plan_id: &str) -> String {
    format!(
        "## Progress Updates\n\n\
         After each iteration, append a progress update to plan `{plan_id}` (referenced as \
         `@{plan_id}` in the plan file) with these subsections in order:\n\n\
         - Current State\n\
         - Completed\n\
         - Remaining\n\
         - Next Iteration Guidance\n\
         - Decisions\n\
         - Lessons Learned\n\
         - Risks"
    )
}

fn important_guidelines_section() -> String {
    "## Important Guidelines\n\n\
     Do not implement, test, or review code directly. All such work must be delegated \
     through `tim subagent ...`. Set a generous timeout (at least 30 minutes) on every \
     delegated call. When a prompt's input exceeds roughly 50 KB, write it to a file and \
     pass `--input-file <path>` instead of inlining it."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_mode_has_tester_and_review() {
        let rendered = render_orchestration_prompt(
            "do the thing",
            "plan-1",
            ExecutionMode::Normal,
            &OrchestrationOptions::default(),
        );
        assert!(rendered.contains("# Orchestration Prompt (Normal mode)"));
        assert!(rendered.contains("tim subagent tester"));
        assert!(rendered.contains("tim review"));
        assert!(rendered.contains("3. Testing"));
        assert!(rendered.contains("4. Review"));
    }

    #[test]
    fn simple_mode_has_verifier_and_no_review() {
        let options = OrchestrationOptions {
            simple_mode: true,
            ..Default::default()
        };
        let rendered = render_orchestration_prompt("ctx", "plan-2", ExecutionMode::Normal, &options);
        assert!(rendered.contains("(Simple mode)"));
        assert!(rendered.contains("tim subagent verifier"));
        assert!(!rendered.contains("tim review"));
        assert!(!rendered.contains("Review\n"));
    }

    #[test]
    fn tdd_mode_inserts_test_phase_before_implementation() {
        let rendered = render_orchestration_prompt(
            "ctx",
            "plan-3",
            ExecutionMode::Tdd,
            &OrchestrationOptions::default(),
        );
        assert!(rendered.contains("1. TDD Test Phase"));
        assert!(rendered.contains("2. Implementation"));
    }

    #[test]
    fn batch_mode_adds_task_selection_as_phase_one() {
        let options = OrchestrationOptions {
            batch_mode: true,
            ..Default::default()
        };
        let rendered = render_orchestration_prompt("ctx", "plan-4", ExecutionMode::Normal, &options);
        assert!(rendered.contains("## Batch Mode"));
        assert!(rendered.contains("1. Task Selection"));
        assert!(rendered.contains("2. Implementation"));
    }

    #[test]
    fn explicit_executor_embeds_flag_and_omits_selection_block() {
        let options = OrchestrationOptions {
            subagent_executor: SubagentExecutor::ClaudeCode,
            ..Default::default()
        };
        let rendered = render_orchestration_prompt("ctx", "plan-5", ExecutionMode::Normal, &options);
        assert!(rendered.contains("tim subagent implementer -x claude-code"));
        assert!(!rendered.contains("Executor Selection"));
    }

    #[test]
    fn dynamic_executor_inserts_selection_block_with_default_text() {
        let rendered = render_orchestration_prompt(
            "ctx",
            "plan-6",
            ExecutionMode::Normal,
            &OrchestrationOptions::default(),
        );
        assert!(rendered.contains("### Executor Selection"));
        assert!(rendered.contains(DEFAULT_EXECUTOR_SELECTION_TEXT));
    }

    #[test]
    fn always_includes_failure_protocol_and_progress_sections() {
        let rendered = render_orchestration_prompt(
            "ctx",
            "plan-7",
            ExecutionMode::Normal,
            &OrchestrationOptions::default(),
        );
        assert!(rendered.contains("## Failure Protocol"));
        assert!(rendered.contains("FAILED: <agent> reported a failure"));
        assert!(rendered.contains("## Progress Updates"));
        assert!(rendered.contains("@plan-7"));
    }
}
