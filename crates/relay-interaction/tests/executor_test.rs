//! Drives `ClaudeCodeExecutor` against shell scripts that speak the stream protocol.
#![cfg(unix)]

use relay_core::session::{SessionStateTracker, TurnFailure};
use relay_core::{PermissionMode, TurnExecutor, TurnOptions};
use relay_interaction::ClaudeCodeExecutor;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

/// Writes `body` as a script and returns an executor that runs it with `sh`.
fn scripted_executor(dir: &TempDir, body: &str) -> (ClaudeCodeExecutor, SessionStateTracker) {
    let script: PathBuf = dir.path().join("fake-claude.sh");
    std::fs::write(&script, body).unwrap();

    let sessions = SessionStateTracker::new();
    let executor = ClaudeCodeExecutor::new("sh", sessions.clone())
        .with_args_prefix([script.to_string_lossy().to_string()]);
    (executor, sessions)
}

const ECHO_ARGS_SCRIPT: &str = r#"
prompt=$(cat)
echo "starting up (not json)"
printf '{"type":"assistant","message":{"content":[{"type":"text","text":"%s | %s"}]}}\n' "$*" "$prompt"
printf '{"type":"result","result":"unused"}\n'
"#;

#[tokio::test]
async fn test_first_turn_creates_then_later_turns_resume() {
    let dir = TempDir::new().unwrap();
    let (executor, sessions) = scripted_executor(&dir, ECHO_ARGS_SCRIPT);
    let options = TurnOptions::new("sonnet");

    let first = executor.execute("ping", "s-1", &options, dir.path()).await;
    assert!(first.is_success(), "{}", first.text);
    assert!(first.text.contains("--session-id s-1"), "{}", first.text);
    assert!(first.text.ends_with("| ping"), "{}", first.text);
    assert!(sessions.is_established("s-1").await);

    let second = executor.execute("pong", "s-1", &options, dir.path()).await;
    assert!(second.text.contains("--resume s-1"), "{}", second.text);
    assert!(!second.text.contains("--session-id"), "{}", second.text);
}

#[tokio::test]
async fn test_permission_mode_is_forwarded() {
    let dir = TempDir::new().unwrap();
    let (executor, _) = scripted_executor(&dir, ECHO_ARGS_SCRIPT);
    let options = TurnOptions::new("opus").with_permission_mode(PermissionMode::AcceptEdits);

    let result = executor.execute("go", "s-2", &options, dir.path()).await;
    assert!(result.text.contains("--model opus"), "{}", result.text);
    assert!(result.text.contains("--permission-mode acceptEdits"), "{}", result.text);
}

#[tokio::test]
async fn test_result_with_denials_and_no_text() {
    let dir = TempDir::new().unwrap();
    let (executor, sessions) = scripted_executor(
        &dir,
        r#"
cat > /dev/null
printf '%s\n' '{"type":"result","result":"","permission_denials":[{"tool_name":"Bash","tool_input":{"command":"rm -rf /"}}]}'
"#,
    );

    let result = executor
        .execute("clean up", "s-3", &TurnOptions::new("sonnet"), dir.path())
        .await;

    assert!(result.is_success());
    assert_eq!(result.text, "");
    assert_eq!(result.permission_denials.len(), 1);
    assert_eq!(result.permission_denials[0].tool_name, "Bash");
    assert!(sessions.is_established("s-3").await);
}

#[tokio::test]
async fn test_exit_failure_reports_code_and_stderr() {
    let dir = TempDir::new().unwrap();
    let (executor, sessions) = scripted_executor(
        &dir,
        r#"
cat > /dev/null
echo "auth error" >&2
exit 1
"#,
    );

    let result = executor
        .execute("hi", "s-4", &TurnOptions::new("sonnet"), dir.path())
        .await;

    assert_eq!(
        result.failure,
        Some(TurnFailure::ProcessExitFailure {
            code: 1,
            stderr: "auth error".to_string()
        })
    );
    assert!(result.text.contains('1'));
    assert!(result.text.contains("auth error"));
    assert!(!sessions.is_established("s-4").await);
}

#[tokio::test]
async fn test_partial_success_still_establishes_session() {
    let dir = TempDir::new().unwrap();
    let (executor, sessions) = scripted_executor(
        &dir,
        r#"
cat > /dev/null
printf '%s\n' '{"type":"content_block_delta","delta":{"type":"text_delta","text":"half an answer"}}'
echo "crashed" >&2
exit 3
"#,
    );

    let result = executor
        .execute("hi", "s-5", &TurnOptions::new("sonnet"), dir.path())
        .await;

    assert!(result.is_success());
    assert_eq!(result.text, "half an answer");
    assert!(sessions.is_established("s-5").await);
}

#[tokio::test]
async fn test_silent_process_times_out() {
    let dir = TempDir::new().unwrap();
    let (executor, sessions) = scripted_executor(&dir, "exec sleep 5\n");
    let executor = executor.with_line_timeout(Duration::from_millis(200));

    let started = std::time::Instant::now();
    let result = executor
        .execute("hi", "s-6", &TurnOptions::new("sonnet"), dir.path())
        .await;

    assert!(matches!(result.failure, Some(TurnFailure::TurnTimeout { .. })));
    assert!(result.text.contains("Timed out"));
    assert!(result.permission_denials.is_empty());
    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(!sessions.is_established("s-6").await);
}

#[tokio::test]
async fn test_timeout_discards_partial_text() {
    let dir = TempDir::new().unwrap();
    let (executor, _) = scripted_executor(
        &dir,
        r#"
printf '%s\n' '{"type":"assistant","message":{"content":[{"type":"text","text":"partial"}]}}'
exec sleep 5
"#,
    );
    let executor = executor.with_line_timeout(Duration::from_millis(300));

    let result = executor
        .execute("hi", "s-7", &TurnOptions::new("sonnet"), dir.path())
        .await;

    assert!(!result.text.contains("partial"));
    assert!(matches!(result.failure, Some(TurnFailure::TurnTimeout { .. })));
}

#[tokio::test]
async fn test_runs_in_working_directory() {
    let dir = TempDir::new().unwrap();
    let workdir = TempDir::new().unwrap();
    let (executor, _) = scripted_executor(
        &dir,
        r#"
cat > /dev/null
printf '{"type":"result","result":"%s"}\n' "$(pwd -P)"
"#,
    );

    let result = executor
        .execute("hi", "s-8", &TurnOptions::new("sonnet"), workdir.path())
        .await;

    let expected = workdir.path().canonicalize().unwrap();
    assert_eq!(PathBuf::from(&result.text), expected);
}
