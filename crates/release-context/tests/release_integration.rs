//! Integration tests against a real session directory.
//!
//! Each test writes a session file into a temp dir, releases through
//! [`FileStore`], and reads the file back to check what was persisted.

use std::sync::Arc;

use release_context::release::RELEASED_PREFIX;
use release_context::{
    ContextReleaser, Conversation, FileStore, Message, ReleaseConfig, ReleaseContextTool,
    ReleaseError, ReleaseRequest, Tool, ToolPart,
};
use tempfile::TempDir;

const SESSION: &str = "ses_integration";

fn read_output(path: &str, lines: usize) -> String {
    let body: Vec<String> = (1..=lines)
        .map(|i| format!("{i:05}| // {path} line {i}"))
        .collect();
    format!(
        "<file>\n{}\n\n(End of file - total {lines} lines)\n</file>",
        body.join("\n")
    )
}

fn session() -> Conversation {
    Conversation::new(SESSION)
        .with_message(Message::user("msg_1", "Look around the repo"))
        .with_message(Message::assistant(
            "msg_2",
            vec![
                ToolPart::completed(
                    SESSION,
                    "call_read_main",
                    "read",
                    "src/main.rs",
                    read_output("src/main.rs", 150),
                ),
                ToolPart::completed(
                    SESSION,
                    "call_read_lib",
                    "read",
                    "src/lib.rs",
                    read_output("src/lib.rs", 40),
                ),
            ],
        ))
        .with_message(Message::assistant(
            "msg_3",
            vec![
                ToolPart::completed(SESSION, "call_ls", "bash", "ls -la", "total 0\n.\n..\n"),
                ToolPart::completed(SESSION, "call_todo", "todowrite", "todos", "[ ] ship it"),
            ],
        ))
        .with_message(Message::assistant(
            "msg_4",
            vec![ToolPart::running(SESSION, "call_build", "bash")],
        ))
}

async fn setup() -> (TempDir, FileStore) {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path()).unwrap();
    store.save(&session()).await.unwrap();
    (dir, store)
}

fn output_of(conv: &Conversation, call_id: &str) -> String {
    conv.messages
        .iter()
        .flat_map(Message::tool_parts)
        .find(|p| p.call_id == call_id)
        .and_then(|p| p.completed_state())
        .map(|c| c.output.clone())
        .unwrap()
}

#[tokio::test]
async fn explicit_release_persists_placeholders() {
    let (_dir, store) = setup().await;
    let releaser = ContextReleaser::new(Arc::new(store.clone()));

    let outcome = releaser
        .release(
            SESSION,
            &ReleaseRequest::calls(["call_read_main", "call_ls"]),
        )
        .await
        .unwrap();
    assert_eq!(outcome.metadata.released_count, 2);
    assert_eq!(outcome.metadata.files[0].path, "src/main.rs");
    assert_eq!(outcome.metadata.files[0].lines, Some(150));
    assert_eq!(outcome.metadata.files[1].path, "ls -la");

    let conv = store.load(SESSION).await.unwrap();
    let main = output_of(&conv, "call_read_main");
    assert!(main.starts_with("[Context released: read]\n- Title: src/main.rs\n- Lines: 150\n"));
    assert!(main.contains("- Released at: "));
    let ls = output_of(&conv, "call_ls");
    assert!(ls.starts_with(RELEASED_PREFIX));
    assert!(!ls.contains("- Lines:"));

    // Untouched parts keep their original output.
    assert!(output_of(&conv, "call_read_lib").starts_with("<file>\n"));
    assert_eq!(conv.messages.len(), 4);
}

#[tokio::test]
async fn second_release_is_rejected_and_file_unchanged() {
    let (dir, store) = setup().await;
    let releaser = ContextReleaser::new(Arc::new(store.clone()));
    releaser
        .release(SESSION, &ReleaseRequest::calls(["call_read_lib"]))
        .await
        .unwrap();
    let path = dir.path().join(format!("{SESSION}.json"));
    let before = std::fs::read_to_string(&path).unwrap();

    let err = releaser
        .release(SESSION, &ReleaseRequest::calls(["call_read_lib"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ReleaseError::TargetAlreadyReleased { .. }));
    assert!(
        err.to_string()
            .contains("You cannot release the same tool call twice")
    );
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[tokio::test]
async fn auto_release_respects_protected_tools_and_skips_running() {
    let (_dir, store) = setup().await;
    let releaser = ContextReleaser::new(Arc::new(store.clone()))
        .with_config(ReleaseConfig::new().protect_tool("todowrite"));

    let outcome = releaser
        .release(SESSION, &ReleaseRequest::auto())
        .await
        .unwrap();
    let paths: Vec<&str> = outcome
        .metadata
        .files
        .iter()
        .map(|f| f.path.as_str())
        .collect();
    assert_eq!(paths, vec!["src/main.rs", "src/lib.rs", "ls -la"]);
    assert!(outcome.output.contains("Skipped 1 running tool(s)"));

    let conv = store.load(SESSION).await.unwrap();
    assert_eq!(output_of(&conv, "call_todo"), "[ ] ship it");

    // Everything releasable is gone now.
    let again = releaser
        .release(SESSION, &ReleaseRequest::auto())
        .await
        .unwrap();
    assert_eq!(again.metadata.released_count, 0);
    assert!(again.output.contains("Skipped 3 already released tool(s)"));
}

#[tokio::test]
async fn tool_round_trip_through_session_file() {
    let (_dir, store) = setup().await;
    let releaser = Arc::new(ContextReleaser::new(Arc::new(store.clone())));
    let tool = ReleaseContextTool::new(releaser.clone(), SESSION).with_arg_validation(true);

    let text = tool
        .execute(r#"{"tools": ["read"], "count": 1}"#)
        .await;
    assert!(text.starts_with("✅ Successfully released 1 tool call(s)"));
    assert!(text.contains("- src/lib.rs\n  Lines: 40\n"));

    let text = tool
        .execute(r#"{"toolCallIds": ["call_build", "call_ls"]}"#)
        .await;
    assert!(text.starts_with("Error: Cannot release tool call call_build"));

    let calls = releaser.list_tool_calls(SESSION).await.unwrap();
    let released: Vec<&str> = calls
        .iter()
        .filter(|c| c.released)
        .map(|c| c.call_id.as_str())
        .collect();
    assert_eq!(released, vec!["call_read_lib"]);
}

#[tokio::test]
async fn unknown_session_and_bad_ids() {
    let (_dir, store) = setup().await;
    let releaser = ContextReleaser::new(Arc::new(store));

    let err = releaser
        .release("ses_missing", &ReleaseRequest::auto())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("session not found"));

    let err = releaser
        .release("../etc", &ReleaseRequest::auto())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("invalid session id"));

    let err = releaser
        .release(SESSION, &ReleaseRequest::calls(["fake-1", "fake-2"]))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("fake-1, fake-2"));
}

#[tokio::test]
async fn release_keeps_host_fields_in_session_file() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path()).unwrap();
    let path = dir.path().join("ses_host.json");
    let json = r#"{
        "id": "ses_host",
        "title": "My session",
        "time": {"created": 1},
        "messages": [
            {"id": "msg_1", "role": "assistant", "parts": [
                {"type": "tool", "id": "prt_c1", "sessionID": "ses_host", "messageID": "msg_1",
                 "callID": "c1", "tool": "bash",
                 "state": {"status": "completed", "input": {"command": "ls"}, "output": "a\nb",
                           "title": "ls", "metadata": {"exit": 0},
                           "time": {"start": 1, "end": 2, "hostField": 7}}}
            ]}
        ]
    }"#;
    std::fs::write(&path, json).unwrap();

    ContextReleaser::new(Arc::new(store))
        .release("ses_host", &ReleaseRequest::calls(["c1"]))
        .await
        .unwrap();

    let back: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(back["title"], "My session");
    assert_eq!(back["time"]["created"], 1);
    let state = &back["messages"][0]["parts"][0]["state"];
    assert!(state["output"].as_str().unwrap().starts_with(RELEASED_PREFIX));
    assert_eq!(state["time"], serde_json::json!({"start": 1, "end": 2, "hostField": 7}));
    assert_eq!(state["metadata"]["exit"], 0);
    assert_eq!(state["input"]["command"], "ls");
}
