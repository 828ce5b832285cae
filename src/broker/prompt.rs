//! Interactive prompts the Broker drives when a rule-map lookup doesn't
//! settle a request: the four-choice approval prompt, the Bash
//! prefix-selection sub-prompt, and AskUserQuestion.

use std::collections::HashMap;

use dialoguer::{Input, MultiSelect, Select};

use crate::error::{Result, TimError};
use crate::types::Question;

/// The four choices offered by the interactive approval prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FourChoice {
    Allow,
    AllowForSession,
    AlwaysAllow,
    Disallow,
}

const FOUR_CHOICE_LABELS: [&str; 4] =
    ["Allow", "Allow for Session", "Always Allow", "Disallow"];

const FREE_TEXT_OPTION: &str = "Free text";

/// Drives every interactive decision the Broker needs from a human.
/// Implementations must serialize prompts globally: two concurrent
/// connections competing for the user both block on the user, FIFO by
/// arrival. The trait itself takes `&self` so a concrete implementation is
/// expected to hold its own internal lock.
pub trait PromptCoordinator: Send + Sync {
    /// Render the truncated YAML input block, bell, and four-choice prompt;
    /// return the user's choice, or the configured timeout default.
    fn prompt_four_choice(&self, tool_name: &str, input_yaml: &str) -> Result<FourChoice>;

    /// Let the user pick which prefix of `actual_command` to persist.
    /// `candidates` is ordered shortest-to-longest, the last entry always
    /// being the exact command.
    fn prompt_prefix_selection(&self, candidates: &[String]) -> Result<String>;

    /// Drive the user through a non-empty list of questions, returning
    /// answers keyed by question text.
    fn prompt_ask_user_question(&self, questions: &[Question]) -> Result<HashMap<String, String>>;
}

/// Non-interactive stand-in: every prompt resolves immediately to the
/// configured timeout default, used for headless runs and tests.
pub struct NullPromptCoordinator {
    approves_on_timeout: bool,
}

impl NullPromptCoordinator {
    #[must_use]
    pub fn new(approves_on_timeout: bool) -> Self {
        Self { approves_on_timeout }
    }
}

impl PromptCoordinator for NullPromptCoordinator {
    fn prompt_four_choice(&self, _tool_name: &str, _input_yaml: &str) -> Result<FourChoice> {
        Ok(if self.approves_on_timeout {
            FourChoice::Allow
        } else {
            FourChoice::Disallow
        })
    }

    fn prompt_prefix_selection(&self, candidates: &[String]) -> Result<String> {
        candidates
            .last()
            .cloned()
            .ok_or_else(|| TimError::broker("prefix selection with no candidates"))
    }

    fn prompt_ask_user_question(&self, _questions: &[Question]) -> Result<HashMap<String, String>> {
        Ok(HashMap::new())
    }
}

/// Real terminal prompt, backed by `dialoguer`. Blocks the calling thread;
/// the Broker runs prompt dispatch via `spawn_blocking` so it doesn't stall
/// the connection's async read loop.
pub struct TerminalPromptCoordinator;

impl TerminalPromptCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalPromptCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptCoordinator for TerminalPromptCoordinator {
    fn prompt_four_choice(&self, tool_name: &str, input_yaml: &str) -> Result<FourChoice> {
        print!("\x07");
        println!("{tool_name}");
        println!("{input_yaml}");

        let selection = Select::new()
            .with_prompt(format!("Approve {tool_name}?"))
            .items(&FOUR_CHOICE_LABELS)
            .default(3)
            .interact_opt()
            .map_err(|e| TimError::broker(e.to_string()))?;

        Ok(match selection {
            Some(0) => FourChoice::Allow,
            Some(1) => FourChoice::AllowForSession,
            Some(2) => FourChoice::AlwaysAllow,
            _ => FourChoice::Disallow,
        })
    }

    fn prompt_prefix_selection(&self, candidates: &[String]) -> Result<String> {
        if candidates.is_empty() {
            return Err(TimError::broker("prefix selection with no candidates"));
        }
        let selection = Select::new()
            .with_prompt("Persist which prefix?")
            .items(candidates)
            .default(candidates.len() - 1)
            .interact_opt()
            .map_err(|e| TimError::broker(e.to_string()))?;
        Ok(selection
            .and_then(|i| candidates.get(i).cloned())
            .unwrap_or_else(|| candidates[candidates.len() - 1].clone()))
    }

    fn prompt_ask_user_question(&self, questions: &[Question]) -> Result<HashMap<String, String>> {
        let mut answers = HashMap::new();
        for question in questions {
            let mut items: Vec<&str> = question
                .options
                .iter()
                .map(|o| o.label.as_str())
                .collect();
            items.push(FREE_TEXT_OPTION);

            let answer = if question.multi_select {
                let selected = MultiSelect::new()
                    .with_prompt(question.question.as_str())
                    .items(&items)
                    .interact()
                    .map_err(|e| TimError::broker(e.to_string()))?;
                let free_text_chosen = selected.iter().any(|&i| items[i] == FREE_TEXT_OPTION);
                let mut parts: Vec<String> = selected
                    .iter()
                    .map(|&i| items[i].to_string())
                    .filter(|label| label != FREE_TEXT_OPTION)
                    .collect();
                if free_text_chosen {
                    parts.push(free_text_answer(&question.question)?);
                }
                parts.join(", ")
            } else {
                let selected = Select::new()
                    .with_prompt(question.question.as_str())
                    .items(&items)
                    .interact()
                    .map_err(|e| TimError::broker(e.to_string()))?;
                if items[selected] == FREE_TEXT_OPTION {
                    free_text_answer(&question.question)?
                } else {
                    items[selected].to_string()
                }
            };

            answers.insert(question.question.clone(), answer);
        }
        Ok(answers)
    }
}

fn free_text_answer(prompt: &str) -> Result<String> {
    Input::new()
        .with_prompt(prompt)
        .interact_text()
        .map_err(|e| TimError::broker(e.to_string()))
}
