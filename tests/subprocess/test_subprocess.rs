//! Integration tests for the Subprocess Driver's CLI discovery and
//! prompt-input conversions.

use tim_agent_core::subprocess::{Executor, PromptInput, SubprocessDriver};

#[test]
fn find_cli_reports_search_result() {
    // We can't assert success since it depends on the host having the
    // agent CLI installed; this exercises the search path itself.
    let result = SubprocessDriver::find_cli(Executor::Claude);
    println!("claude CLI search result: {result:?}");
}

#[test]
fn prompt_input_conversions() {
    let from_str: PromptInput = "hello".into();
    let from_string: PromptInput = String::from("world").into();

    assert!(matches!(from_str, PromptInput::String(ref s) if s == "hello"));
    assert!(matches!(from_string, PromptInput::String(ref s) if s == "world"));
}

#[test]
fn executor_binary_names_differ() {
    assert_ne!(Executor::Claude.binary_name(), Executor::Codex.binary_name());
}
