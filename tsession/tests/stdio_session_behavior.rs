#![cfg(unix)]

use std::time::Duration;

use serde_json::{Map, Value, json};
use tsession::{ServerCommand, SessionConfig, SessionErrorKind, SessionState, StdioSession};

const HANDSHAKE: &str = r#"
read -r line
printf '%s\n' '{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05","capabilities":{"tools":{}},"serverInfo":{"name":"weather","version":"1.2.0"}}}'
read -r line
"#;

fn scripted(body: &str) -> ServerCommand {
    ServerCommand::new("sh", vec!["-c".to_string(), format!("{HANDSHAKE}{body}")])
}

fn config() -> SessionConfig {
    SessionConfig::default()
        .with_session_id("test-server")
        .with_handshake_timeout(Duration::from_secs(5))
        .with_call_timeout(Duration::from_secs(5))
        .with_close_grace(Duration::from_millis(500))
}

fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object literal")
}

#[tokio::test]
async fn handshake_discovery_and_call_follow_the_protocol() {
    let script = r#"
read -r line
printf '%s\n' '{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"get_alerts","description":"Alerts for a state","inputSchema":{"type":"object"}}],"nextCursor":"page-2"}}'
read -r line
case "$line" in *'"cursor":"page-2"'*) ;; *) exit 3 ;; esac
printf '%s\n' '{"jsonrpc":"2.0","id":3,"result":{"tools":[{"name":"get_forecast","inputSchema":{"type":"object"}}]}}'
read -r line
case "$line" in *get_forecast*) ;; *) exit 4 ;; esac
printf '%s\n' '{"jsonrpc":"2.0","id":4,"result":{"content":[{"type":"text","text":"Sunny"},{"type":"text","text":"High 75F"}]}}'
read -r line
"#;

    let session = StdioSession::connect_command(scripted(script), config())
        .await
        .expect("handshake should succeed");
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.server().info.name, "weather");
    assert_eq!(session.server().info.version, "1.2.0");
    assert_eq!(session.server().protocol_version, "2024-11-05");

    let tools = session.list_tools().await.expect("discovery should succeed");
    let names = tools.iter().map(|tool| tool.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["get_alerts", "get_forecast"]);
    assert_eq!(tools[0].description.as_deref(), Some("Alerts for a state"));

    let output = session
        .call_tool(
            "get_forecast",
            args(json!({"latitude": 38.5, "longitude": -121.5})),
        )
        .await
        .expect("call should succeed");
    assert_eq!(output.text(), "Sunny\nHigh 75F");

    session.close().await.expect("close should succeed");
    session.close().await.expect("close is idempotent");
    assert_eq!(session.state(), SessionState::Closed);

    let error = session
        .call_tool("get_forecast", Map::new())
        .await
        .expect_err("closed session should refuse calls");
    assert_eq!(error.kind, SessionErrorKind::Protocol);
}

#[tokio::test]
async fn responses_are_routed_by_id_not_arrival_order() {
    let script = r#"
id_of() { printf '%s' "$1" | sed -n 's/.*"id":\([0-9][0-9]*\).*/\1/p'; }
name_of() { printf '%s' "$1" | sed -n 's/.*"name":"\([^"]*\)".*/\1/p'; }
read -r first
read -r second
for line in "$second" "$first"; do
  printf '{"jsonrpc":"2.0","id":%s,"result":{"content":[{"type":"text","text":"%s"}]}}\n' "$(id_of "$line")" "$(name_of "$line")"
done
read -r line
"#;

    let session = StdioSession::connect_command(scripted(script), config())
        .await
        .expect("handshake should succeed");

    let (alpha, beta) = tokio::join!(
        session.call_tool("alpha", Map::new()),
        session.call_tool("beta", Map::new())
    );

    assert_eq!(alpha.expect("alpha should succeed").text(), "alpha");
    assert_eq!(beta.expect("beta should succeed").text(), "beta");
    session.close().await.expect("close should succeed");
}

#[tokio::test]
async fn tool_failures_leave_the_session_usable() {
    let script = r#"
read -r line
printf '%s\n' '{"jsonrpc":"2.0","id":2,"result":{"content":[{"type":"text","text":"Unknown city"}],"isError":true}}'
read -r line
printf '%s\n' '{"jsonrpc":"2.0","id":3,"error":{"code":-32602,"message":"Unknown tool: nope"}}'
read -r line
printf '%s\n' '{"jsonrpc":"2.0","id":4,"result":{"content":[{"type":"text","text":"ok"}]}}'
read -r line
"#;

    let session = StdioSession::connect_command(scripted(script), config())
        .await
        .expect("handshake should succeed");

    let reported = session
        .call_tool("get_forecast", args(json!({"city": "Atlantis"})))
        .await
        .expect_err("isError result should fail");
    assert_eq!(reported.kind, SessionErrorKind::ToolExecution);
    assert_eq!(reported.message, "Unknown city");
    assert_eq!(reported.tool_name.as_deref(), Some("get_forecast"));

    let rejected = session
        .call_tool("nope", Map::new())
        .await
        .expect_err("JSON-RPC error should fail");
    assert_eq!(rejected.kind, SessionErrorKind::ToolExecution);
    assert_eq!(rejected.message, "Unknown tool: nope");

    let output = session
        .call_tool("get_forecast", args(json!({"city": "Sacramento"})))
        .await
        .expect("session should still serve calls");
    assert_eq!(output.text(), "ok");
    assert_eq!(session.state(), SessionState::Ready);
    session.close().await.expect("close should succeed");
}

#[tokio::test]
async fn timed_out_call_is_cancelled_and_session_survives() {
    let script = r#"
read -r line
read -r line
case "$line" in *notifications/cancelled*'"requestId":2'*) note=cancel-seen ;; *) note=no-cancel ;; esac
read -r line
printf '{"jsonrpc":"2.0","id":3,"result":{"content":[{"type":"text","text":"%s"}]}}\n' "$note"
read -r line
"#;

    let session = StdioSession::connect_command(
        scripted(script),
        config().with_call_timeout(Duration::from_millis(300)),
    )
    .await
    .expect("handshake should succeed");

    let error = session
        .call_tool("slow", Map::new())
        .await
        .expect_err("unanswered call should time out");
    assert_eq!(error.kind, SessionErrorKind::Timeout);

    let output = session
        .call_tool("fast", Map::new())
        .await
        .expect("next call should succeed");
    assert_eq!(output.text(), "cancel-seen");
    session.close().await.expect("close should succeed");
}

#[tokio::test]
async fn server_requests_notifications_and_noise_are_handled() {
    let script = r#"
printf '%s\n' '{"jsonrpc":"2.0","id":"srv-1","method":"ping"}'
printf '%s\n' '{"jsonrpc":"2.0","id":7,"method":"sampling/createMessage","params":{}}'
printf '%s\n' '{"jsonrpc":"2.0","method":"notifications/message","params":{"level":"info","data":"hi"}}'
printf '%s\n' '{"jsonrpc":"2.0","id":99,"result":{}}'
printf '%s\n' 'Starting weather server...'
read -r a
read -r b
read -r c
all="$a$b$c"
answer=ok
case "$all" in *'"id":"srv-1","result":{}'*) ;; *) answer=no-pong ;; esac
case "$all" in *'"id":7,"error":{"code":-32601'*) ;; *) answer=no-decline ;; esac
printf '{"jsonrpc":"2.0","id":2,"result":{"content":[{"type":"text","text":"%s"}]}}\n' "$answer"
read -r line
"#;

    let session = StdioSession::connect_command(scripted(script), config())
        .await
        .expect("handshake should succeed");

    let output = session
        .call_tool("get_alerts", args(json!({"state": "CA"})))
        .await
        .expect("call should succeed");
    assert_eq!(output.text(), "ok");
    session.close().await.expect("close should succeed");
}

#[tokio::test]
async fn stream_closing_mid_request_is_a_transport_error() {
    let script = r#"
read -r line
exit 0
"#;

    let session = StdioSession::connect_command(scripted(script), config())
        .await
        .expect("handshake should succeed");

    let error = session
        .call_tool("get_alerts", Map::new())
        .await
        .expect_err("closed stream should fail the call");
    assert_eq!(error.kind, SessionErrorKind::Transport);
    assert_eq!(session.state(), SessionState::Closed);

    let error = session
        .list_tools()
        .await
        .expect_err("later operations fail fast");
    assert_eq!(error.kind, SessionErrorKind::Transport);
    session.close().await.expect("close after loss should still succeed");
}

#[tokio::test]
async fn server_exiting_right_after_initialize_never_looks_ready() {
    let script = r#"
read -r line
printf '%s\n' '{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05","capabilities":{},"serverInfo":{"name":"flaky","version":"0.1.0"}}}'
exit 0
"#;

    for _ in 0..5 {
        let connected = StdioSession::connect_command(
            ServerCommand::new("sh", vec!["-c".to_string(), script.to_string()]),
            config().with_call_timeout(Duration::from_secs(30)),
        )
        .await;

        let session = match connected {
            Ok(session) => session,
            Err(error) => {
                assert_eq!(error.kind, SessionErrorKind::Connect);
                continue;
            }
        };

        let error = tokio::time::timeout(Duration::from_secs(5), session.list_tools())
            .await
            .expect("a dead server must not leave requests hanging")
            .expect_err("dead server cannot list tools");
        assert_eq!(error.kind, SessionErrorKind::Transport);
        assert_eq!(session.state(), SessionState::Closed);
        session.close().await.expect("close after loss should succeed");
    }
}

#[tokio::test]
async fn abandoned_call_still_writes_a_whole_line() {
    let script = r#"
sleep 1
read -r line
verdict=intact
case "$line" in '{"jsonrpc":"2.0"'*'"name":"upload"}}') ;; *) verdict=torn ;; esac
[ "${#line}" -gt 200000 ] || verdict=torn
while read -r line; do
  case "$line" in
    '{"jsonrpc":"2.0"'*'"name":"check"'*)
      id=${line#*\"id\":}
      id=${id%%,*}
      printf '{"jsonrpc":"2.0","id":%s,"result":{"content":[{"type":"text","text":"%s"}]}}\n' "$id" "$verdict"
      ;;
  esac
done
"#;

    let session = StdioSession::connect_command(scripted(script), config())
        .await
        .expect("handshake should succeed");

    // Larger than a pipe buffer, so the write is still in progress when the caller gives up.
    let blob = "x".repeat(200_000);
    let upload = tokio::time::timeout(
        Duration::from_millis(50),
        session.call_tool("upload", args(json!({ "blob": blob }))),
    )
    .await;
    assert!(upload.is_err(), "upload should still be in flight");

    let output = session
        .call_tool("check", Map::new())
        .await
        .expect("session should still be usable");
    assert_eq!(output.text(), "intact");
    session.close().await.expect("close should succeed");
}

#[tokio::test]
async fn repeated_discovery_returns_the_same_catalog() {
    let script = r#"
while read -r line; do
  case "$line" in
    *'"method":"tools/list"'*)
      id=${line#*\"id\":}
      id=${id%%,*}
      printf '{"jsonrpc":"2.0","id":%s,"result":{"tools":[{"name":"get_alerts","inputSchema":{"type":"object"}},{"name":"get_forecast","inputSchema":{"type":"object"}}]}}\n' "$id"
      ;;
  esac
done
"#;

    let session = StdioSession::connect_command(scripted(script), config())
        .await
        .expect("handshake should succeed");

    let first = session.list_tools().await.expect("first discovery");
    let second = session.list_tools().await.expect("second discovery");
    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    session.close().await.expect("close should succeed");
}

#[tokio::test]
async fn connection_failures_are_connect_errors() {
    let missing = StdioSession::connect_command(
        ServerCommand::new("tether-test-no-such-binary", Vec::new()),
        config(),
    )
    .await
    .expect_err("missing binary should fail");
    assert_eq!(missing.kind, SessionErrorKind::Connect);

    let exits = StdioSession::connect_command(
        ServerCommand::new("sh", vec!["-c".to_string(), "exit 0".to_string()]),
        config(),
    )
    .await
    .expect_err("server exiting before handshake should fail");
    assert_eq!(exits.kind, SessionErrorKind::Connect);

    let silent = StdioSession::connect_command(
        ServerCommand::new("sh", vec!["-c".to_string(), "sleep 5".to_string()]),
        config().with_handshake_timeout(Duration::from_millis(200)),
    )
    .await
    .expect_err("silent server should time out");
    assert_eq!(silent.kind, SessionErrorKind::Connect);
    assert!(silent.message.contains("timed out"));
}

#[tokio::test]
async fn scripts_are_vetted_before_anything_is_spawned() {
    let unsupported = StdioSession::connect("server.txt", config())
        .await
        .expect_err("text file should be rejected");
    assert_eq!(unsupported.kind, SessionErrorKind::UnsupportedScript);

    let missing = StdioSession::connect("definitely/not/here.py", config())
        .await
        .expect_err("missing script should be rejected");
    assert_eq!(missing.kind, SessionErrorKind::Connect);
}
