//! Per-connection request/response handling: newline-delimited JSON
//! framing, rule-map lookup, the `rm` auto-approval probe, and the
//! interactive prompts, checked in that order.

use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::UnixStream;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::error::{Result, TimError};
use crate::types::{AskUserQuestionInput, PermissionRequest, PermissionResponse};

use super::autotrack::auto_approves_rm;
use super::config::BrokerState;
use crate::framing::{read_frame, write_frame, FrameOutcome};
use super::prompt::FourChoice;

const YAML_TRUNCATE_LIMIT: usize = 500;

/// Own one accepted connection end to end: read requests until the peer
/// closes, dispatch each, and write back a correlated response.
///
/// Multiple requests on one connection may be in flight at once (the
/// newline buffer only serializes *parsing*, not dispatch); each is
/// dispatched on its own task tracked in a `JoinSet` so a slow interactive
/// prompt on one request doesn't stall another request's Bash-prefix lookup
/// on the same connection. Writes share one `Mutex`-guarded half so two
/// concurrently resolving requests can't interleave partial frames.
///
/// On peer close (or a read error), the read loop breaks and every still
/// pending per-request task in the `JoinSet` is aborted, treating any
/// outstanding request as denied rather than leaving it blocked on a user
/// prompt for a connection that no longer exists.
pub async fn handle_connection(stream: UnixStream, state: Arc<BrokerState>) {
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let writer = Arc::new(Mutex::new(write_half));
    let mut pending = JoinSet::new();

    loop {
        match read_frame::<_, PermissionRequest>(&mut reader).await {
            Ok(Some(FrameOutcome::Parsed(request))) => {
                let state = Arc::clone(&state);
                let writer = Arc::clone(&writer);
                pending.spawn(async move {
                    let response = dispatch(&state, &request).await.unwrap_or_else(|e| {
                        log::warn!("broker: request {} failed: {e}", request.request_id.as_str());
                        PermissionResponse::simple(request.request_id.clone(), false)
                    });
                    let mut guard = writer.lock().await;
                    if let Err(e) = write_frame(&mut guard, &response).await {
                        log::warn!("broker: failed writing response: {e}");
                    }
                });
            }
            Ok(Some(FrameOutcome::Malformed)) => continue,
            Ok(None) => break,
            Err(e) => {
                log::warn!("broker: connection read error: {e}");
                break;
            }
        }
    }

    // Peer is gone: abort every still-pending request task rather than let
    // it keep blocking on `state.prompt_lock` / a user prompt for a
    // connection nothing will ever read the reply on.
    pending.abort_all();
    while pending.join_next().await.is_some() {}
}

async fn dispatch(state: &Arc<BrokerState>, request: &PermissionRequest) -> Result<PermissionResponse> {
    if request.tool_name == "AskUserQuestion" {
        return dispatch_ask_user_question(state, request).await;
    }

    let command = request.input.get("command").and_then(|v| v.as_str());

    let already_approved = state
        .rule_map
        .lock()
        .await
        .is_approved(&request.tool_name, command);
    if already_approved {
        return Ok(PermissionResponse::simple(request.request_id.clone(), true));
    }

    if request.tool_name == "Bash" && state.auto_approve_created_file_deletion {
        if let Some(command) = command {
            let tracked = state.tracked_files.lock().await;
            if auto_approves_rm(command, &state.cwd, &tracked) {
                return Ok(PermissionResponse::simple(request.request_id.clone(), true));
            }
        }
    }

    dispatch_interactive(state, request, command).await
}

async fn dispatch_ask_user_question(
    state: &Arc<BrokerState>,
    request: &PermissionRequest,
) -> Result<PermissionResponse> {
    let input: AskUserQuestionInput = serde_json::from_value(request.input.clone())
        .map_err(|e| TimError::broker(format!("malformed AskUserQuestion input: {e}")))?;

    if input.questions.is_empty() {
        return Ok(PermissionResponse::simple(request.request_id.clone(), false));
    }

    let coordinator = Arc::clone(&state.prompt_coordinator);
    let questions = input.questions.clone();
    let answers = run_prompt(state, move || coordinator.prompt_ask_user_question(&questions)).await;

    match answers {
        Some(Ok(answers)) => Ok(PermissionResponse::with_answers(
            request.request_id.clone(),
            input.questions,
            answers,
        )),
        _ => Ok(PermissionResponse::simple(request.request_id.clone(), false)),
    }
}

async fn dispatch_interactive(
    state: &Arc<BrokerState>,
    request: &PermissionRequest,
    command: Option<&str>,
) -> Result<PermissionResponse> {
    let input_yaml = truncated_yaml(&request.input);
    let tool_name = request.tool_name.clone();
    let coordinator = Arc::clone(&state.prompt_coordinator);

    let choice = run_prompt(state, move || {
        coordinator.prompt_four_choice(&tool_name, &input_yaml)
    })
    .await;

    let Some(Ok(choice)) = choice else {
        return Ok(PermissionResponse::simple(
            request.request_id.clone(),
            state.prompt_timeout_approves,
        ));
    };

    match choice {
        FourChoice::Allow => Ok(PermissionResponse::simple(request.request_id.clone(), true)),
        FourChoice::Disallow => Ok(PermissionResponse::simple(request.request_id.clone(), false)),
        FourChoice::AllowForSession | FourChoice::AlwaysAllow => {
            persist_rule(state, request, command, choice == FourChoice::AlwaysAllow).await?;
            Ok(PermissionResponse::simple(request.request_id.clone(), true))
        }
    }
}

async fn persist_rule(
    state: &Arc<BrokerState>,
    request: &PermissionRequest,
    command: Option<&str>,
    always: bool,
) -> Result<()> {
    let rule_string = if request.tool_name == "Bash" {
        let Some(command) = command else {
            return Ok(());
        };
        let candidates = prefix_candidates(command);
        let coordinator = Arc::clone(&state.prompt_coordinator);
        let chosen = run_prompt(state, move || coordinator.prompt_prefix_selection(&candidates))
            .await
            .transpose()
            .unwrap_or(None)
            .unwrap_or_else(|| command.to_string());
        format!("Bash({chosen})")
    } else {
        request.tool_name.clone()
    };

    state.rule_map.lock().await.apply_allow_string(&rule_string);

    if always {
        if let Err(e) = crate::settings::persist_local_rule(&state.project_root, &rule_string) {
            log::warn!("broker: failed to persist rule to repo-local settings: {e}");
        }
        let identity = crate::settings::repo_identity(&state.project_root);
        if let Err(e) = state.shared_store.persist(&identity, &rule_string) {
            log::warn!("broker: failed to persist rule to shared store: {e}");
        }
    }

    Ok(())
}

/// Run one blocking prompt call under the global prompt lock and the
/// configured timeout. `None` means the timeout elapsed.
async fn run_prompt<F, T>(state: &Arc<BrokerState>, f: F) -> Option<Result<T>>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let _permit = state.prompt_lock.lock().await;
    let task = tokio::task::spawn_blocking(f);
    match tokio::time::timeout(state.prompt_timeout, task).await {
        Ok(Ok(result)) => Some(result),
        Ok(Err(_join_error)) => None,
        Err(_timeout) => None,
    }
}

fn truncated_yaml(value: &serde_json::Value) -> String {
    let rendered = serde_yaml::to_string(value).unwrap_or_else(|_| value.to_string());
    if rendered.len() > YAML_TRUNCATE_LIMIT {
        let mut truncated = rendered[..YAML_TRUNCATE_LIMIT].to_string();
        truncated.push_str("...");
        truncated
    } else {
        rendered
    }
}

/// Cumulative word-prefixes of `command`, shortest first, the exact
/// command last: from `git status --short` choose `git`, `git status`, or
/// the exact command.
fn prefix_candidates(command: &str) -> Vec<String> {
    let words: Vec<&str> = command.split_whitespace().collect();
    let mut candidates = Vec::with_capacity(words.len());
    for i in 1..=words.len() {
        candidates.push(words[..i].join(" "));
    }
    if candidates.last().map(String::as_str) != Some(command) {
        candidates.push(command.to_string());
    }
    candidates
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    use tokio::io::AsyncWriteExt;

    use super::super::prompt::PromptCoordinator;
    use super::*;
    use crate::types::{Question, RuleMap};

    #[test]
    fn prefix_candidates_cumulative() {
        let candidates = prefix_candidates("git status --short");
        assert_eq!(candidates, vec!["git", "git status", "git status --short"]);
    }

    #[test]
    fn truncated_yaml_respects_limit() {
        let big = serde_json::json!({"command": "x".repeat(1000)});
        let rendered = truncated_yaml(&big);
        assert!(rendered.len() <= YAML_TRUNCATE_LIMIT + 3);
    }

    /// A `PromptCoordinator` whose four-choice prompt blocks far longer than
    /// any reasonable test timeout, standing in for a real interactive
    /// prompt nobody is ever going to answer on a closed connection.
    struct SlowCoordinator;

    impl PromptCoordinator for SlowCoordinator {
        fn prompt_four_choice(&self, _tool_name: &str, _input_yaml: &str) -> Result<FourChoice> {
            std::thread::sleep(Duration::from_secs(5));
            Ok(FourChoice::Disallow)
        }

        fn prompt_prefix_selection(&self, candidates: &[String]) -> Result<String> {
            Ok(candidates.last().cloned().unwrap_or_default())
        }

        fn prompt_ask_user_question(&self, _questions: &[Question]) -> Result<HashMap<String, String>> {
            Ok(HashMap::new())
        }
    }

    #[tokio::test]
    async fn peer_close_aborts_pending_interactive_prompt() {
        let state = Arc::new(
            BrokerState::new(PathBuf::from("/tmp"), PathBuf::from("/tmp"), RuleMap::new())
                .with_prompt_coordinator(Arc::new(SlowCoordinator)),
        );

        let (server_stream, mut client_stream) = UnixStream::pair().expect("unix stream pair");

        let handle = tokio::spawn(handle_connection(server_stream, state));

        client_stream
            .write_all(b"{\"type\":\"permission_request\",\"requestId\":\"r1\",\"tool_name\":\"Edit\",\"input\":{}}\n")
            .await
            .expect("write request");
        // Close the peer immediately, well before the 5s prompt could ever
        // resolve, simulating the agent process exiting mid-prompt.
        drop(client_stream);

        let result = tokio::time::timeout(Duration::from_millis(500), handle).await;
        assert!(
            result.is_ok(),
            "handle_connection must return promptly on peer close instead of blocking on the \
             abandoned interactive prompt"
        );
    }
}
