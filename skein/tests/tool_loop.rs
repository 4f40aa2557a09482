//! Integration tests: manual tool loop against MockLlm and the arithmetic registry.
//!
//! Counts model calls and checks history shape, fatal errors and bounds.

mod init_logging;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use skein::{math_registry, AgentError, LlmResponse, Message, MockLlm, ToolCall, ToolLoop};
use tokio_util::sync::CancellationToken;

fn add(inputs: &str) -> ToolCall {
    ToolCall::new("add_numbers", json!({ "inputs": inputs }).to_string())
}

/// **Scenario**: No tool calls: one model call, content returned unchanged.
#[tokio::test]
async fn no_tool_call_returns_content_after_one_call() {
    let llm = Arc::new(MockLlm::with_no_tool_calls("  Paris.\n"));
    let run = ToolLoop::new(llm.clone(), Arc::new(math_registry()))
        .run("Capital of France?", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(run.answer, "  Paris.\n");
    assert_eq!(llm.call_count(), 1);
    assert_eq!(run.history, vec![Message::user("Capital of France?")]);
}

/// **Scenario**: N tool rounds then an answer: N+1 calls and a 2N+1 message history.
#[tokio::test]
async fn n_rounds_give_n_plus_one_calls() {
    let llm = Arc::new(MockLlm::scripted(vec![
        LlmResponse::with_tool_calls("", vec![add("1 2")]),
        LlmResponse::with_tool_calls("", vec![add("3 4")]),
        LlmResponse::with_tool_calls("", vec![add("5 6")]),
        LlmResponse::text("done"),
    ]));
    let run = ToolLoop::new(llm.clone(), Arc::new(math_registry()))
        .run("add things", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(run.answer, "done");
    assert_eq!(llm.call_count(), 4);
    assert_eq!(run.model_calls, 4);
    assert_eq!(run.history.len(), 2 * 3 + 1);
    assert_eq!(run.history[2].content(), r#"{"result":3}"#);
    assert_eq!(run.history[6].content(), r#"{"result":11}"#);

    // every tool result answers the id of the request right before it
    for pair in run.history[1..].chunks(2) {
        let id = pair[0].tool_calls()[0].id.clone().unwrap();
        match &pair[1] {
            Message::Tool { call_id, .. } => assert_eq!(call_id, &id),
            other => panic!("expected tool message, got {other:?}"),
        }
    }

    // the last request saw the whole history
    assert_eq!(llm.requests()[3].len(), 7);
}

/// **Scenario**: An unregistered tool aborts the run; the model is not called again.
#[tokio::test]
async fn unknown_tool_aborts_without_further_calls() {
    let llm = Arc::new(MockLlm::new(
        "",
        vec![ToolCall::new("launch_rocket", "{}")],
    ));
    let err = ToolLoop::new(llm.clone(), Arc::new(math_registry()))
        .invoke("go")
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::UnknownTool(ref name) if name == "launch_rocket"));
    assert_eq!(llm.call_count(), 1);
}

/// **Scenario**: Bad tool arguments are absorbed as an error string and the loop goes on.
#[tokio::test]
async fn tool_error_is_fed_back_to_the_model() {
    let llm = Arc::new(MockLlm::scripted(vec![
        LlmResponse::with_tool_calls("", vec![ToolCall::new("add_numbers", "not json")]),
        LlmResponse::text("sorry"),
    ]));
    let run = ToolLoop::new(llm.clone(), Arc::new(math_registry()))
        .run("add", &CancellationToken::new())
        .await
        .unwrap();
    assert!(run.history[2].content().starts_with("Error:"));
    assert_eq!(run.answer, "sorry");
}

/// **Scenario**: A model that never stops asking for tools hits the iteration bound.
#[tokio::test]
async fn endless_tool_requests_are_a_runaway_loop() {
    let llm = Arc::new(MockLlm::new("", vec![add("1 1")]));
    let err = ToolLoop::new(llm.clone(), Arc::new(math_registry()))
        .with_max_iterations(3)
        .invoke("loop")
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::RunawayLoop { limit: 3 }));
    assert_eq!(llm.call_count(), 3);
}

/// **Scenario**: A slow model call exceeds the per-call timeout.
#[tokio::test]
async fn slow_model_times_out() {
    let llm = Arc::new(MockLlm::with_no_tool_calls("late").with_delay(Duration::from_millis(200)));
    let err = ToolLoop::new(llm, Arc::new(math_registry()))
        .with_call_timeout(Duration::from_millis(20))
        .invoke("hi")
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::Timeout(_)));
    assert!(err.is_recoverable());
}

/// **Scenario**: Cancelling the token stops the run at the pending model call.
#[tokio::test]
async fn cancellation_stops_the_run() {
    let llm = Arc::new(MockLlm::with_no_tool_calls("never").with_delay(Duration::from_secs(5)));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });
    let err = ToolLoop::new(llm, Arc::new(math_registry()))
        .run("hi", &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::Cancelled));
}
