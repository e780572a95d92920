use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value, json};
use tchat::ChatService;
use tcommon::BoxFuture;
use tether::{CliArgs, ClientConfig, ClientErrorKind, DriverExit, EnvMap, InteractiveDriver};
use tokio::io::BufReader;
use tprovider::{
    ContentBlock, ModelProvider, ModelRequest, ModelResponse, ProviderError, ProviderId,
    StopReason, TokenUsage,
};
use tsession::{
    ServerDetails, ServerInfo, SessionError, ToolDescriptor, ToolOutput, ToolSession,
};

struct ScriptedProvider {
    responses: Mutex<VecDeque<Vec<ContentBlock>>>,
    requests: Mutex<u32>,
}

impl ScriptedProvider {
    fn new(responses: Vec<Vec<ContentBlock>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(0),
        })
    }

    fn request_count(&self) -> u32 {
        *self.requests.lock().expect("requests lock")
    }
}

impl ModelProvider for ScriptedProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Anthropic
    }

    fn complete<'a>(
        &'a self,
        request: ModelRequest,
    ) -> BoxFuture<'a, Result<ModelResponse, ProviderError>> {
        Box::pin(async move {
            *self.requests.lock().expect("requests lock") += 1;
            let content = self
                .responses
                .lock()
                .expect("responses lock")
                .pop_front()
                .ok_or_else(|| ProviderError::other("no scripted response left"))?;

            Ok(ModelResponse {
                provider: ProviderId::Anthropic,
                model: request.model,
                stop_reason: StopReason::EndTurn,
                content,
                usage: TokenUsage::default(),
            })
        })
    }
}

/// Replays scripted results; the `stall` tool never answers.
struct ScriptedTools {
    results: Mutex<VecDeque<Result<ToolOutput, SessionError>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTools {
    fn new(results: Vec<Result<ToolOutput, SessionError>>) -> Arc<Self> {
        Arc::new(Self {
            results: Mutex::new(results.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl ToolSession for ScriptedTools {
    fn list_tools<'a>(&'a self) -> BoxFuture<'a, Result<Vec<ToolDescriptor>, SessionError>> {
        Box::pin(async move {
            Ok(vec![ToolDescriptor::new(
                "lookup",
                "Looks up a value",
                json!({"type": "object"}),
            )])
        })
    }

    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        _arguments: Map<String, Value>,
    ) -> BoxFuture<'a, Result<ToolOutput, SessionError>> {
        Box::pin(async move {
            self.calls.lock().expect("calls lock").push(name.to_string());
            if name == "stall" {
                std::future::pending::<()>().await;
            }
            self.results
                .lock()
                .expect("results lock")
                .pop_front()
                .unwrap_or_else(|| Err(SessionError::transport("no scripted result left")))
        })
    }
}

fn lookup(id: &str) -> ContentBlock {
    let mut input = Map::new();
    input.insert("x".to_string(), json!(1));
    ContentBlock::tool_use(id, "lookup", input)
}

fn service(provider: &Arc<ScriptedProvider>, tools: &Arc<ScriptedTools>) -> ChatService {
    ChatService::builder(provider.clone(), tools.clone()).build()
}

async fn drive(input: &str, service: &ChatService) -> (DriverExit, String) {
    let mut driver = InteractiveDriver::new(input.as_bytes(), Vec::new());
    let exit = driver.run(service).await.expect("driver io");
    let (_, output) = driver.into_parts();
    (exit, String::from_utf8(output).expect("utf8 output"))
}

#[tokio::test]
async fn quit_exits_without_touching_the_model() {
    let provider = ScriptedProvider::new(Vec::new());
    let tools = ScriptedTools::new(Vec::new());

    let (exit, output) = drive("  QUIT \n", &service(&provider, &tools)).await;

    assert_eq!(exit, DriverExit::Quit);
    assert_eq!(exit.exit_code(), 0);
    assert!(output.contains("MCP Client Started!"));
    assert!(output.contains("Type your queries or 'quit' to exit."));
    assert_eq!(provider.request_count(), 0);
    assert!(tools.calls().is_empty());
}

#[tokio::test]
async fn answers_are_printed_and_blank_lines_skipped() {
    let provider = ScriptedProvider::new(vec![
        vec![lookup("toolu_1")],
        vec![ContentBlock::text("The answer is 42")],
    ]);
    let tools = ScriptedTools::new(vec![Ok(ToolOutput::from_text("42"))]);

    let (exit, output) = drive("\n   \nwhat is x?\nquit\n", &service(&provider, &tools)).await;

    assert_eq!(exit, DriverExit::Quit);
    assert!(output.contains("\n[Calling tool lookup with args {\"x\":1}]\nThe answer is 42\n"));
    assert_eq!(output.matches("\nQuery: ").count(), 4);
    assert_eq!(provider.request_count(), 2);
}

#[tokio::test]
async fn tool_failure_is_reported_and_the_loop_continues() {
    let provider = ScriptedProvider::new(vec![
        vec![lookup("toolu_1")],
        vec![ContentBlock::text("second answer")],
    ]);
    let tools = ScriptedTools::new(vec![Err(SessionError::tool_execution("boom"))]);

    let (exit, output) = drive("first\nsecond\n", &service(&provider, &tools)).await;

    assert_eq!(exit, DriverExit::EndOfInput);
    let error_at = output.find("\nError: ").expect("error line");
    let answer_at = output.find("\nsecond answer\n").expect("second answer");
    assert!(error_at < answer_at);
    assert!(output[error_at..answer_at].contains("boom"));
}

#[tokio::test]
async fn lost_transport_ends_the_session() {
    let provider = ScriptedProvider::new(vec![vec![lookup("toolu_1")]]);
    let tools = ScriptedTools::new(vec![Err(SessionError::transport("server exited"))]);

    let (exit, output) = drive("first\nsecond\n", &service(&provider, &tools)).await;

    assert_eq!(exit, DriverExit::SessionLost);
    assert_eq!(exit.exit_code(), 1);
    assert!(output.contains("The tool server connection was lost; exiting."));
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn interrupt_cancels_the_running_query_only() {
    let provider = ScriptedProvider::new(vec![
        vec![ContentBlock::tool_use("toolu_1", "stall", Map::new())],
        vec![ContentBlock::text("still here")],
    ]);
    let tools = ScriptedTools::new(Vec::new());
    let service = service(&provider, &tools);

    // The second interrupt future is the one raced against the first query.
    let mut armed = 0;
    let mut driver = InteractiveDriver::new("hang\nagain\nquit\n".as_bytes(), Vec::new())
        .with_interrupt(move || {
            armed += 1;
            let signal: BoxFuture<'static, ()> = if armed == 2 {
                Box::pin(async {})
            } else {
                Box::pin(std::future::pending::<()>())
            };
            signal
        });

    let exit = driver.run(&service).await.expect("driver io");
    let (_, output) = driver.into_parts();
    let output = String::from_utf8(output).expect("utf8 output");

    assert_eq!(exit, DriverExit::Quit);
    assert!(output.contains("\nQuery cancelled.\n"));
    assert!(output.contains("\nstill here\n"));
    assert_eq!(tools.calls(), vec!["stall".to_string()]);
}

#[tokio::test]
async fn interrupt_at_the_prompt_exits_cleanly() {
    let provider = ScriptedProvider::new(Vec::new());
    let tools = ScriptedTools::new(Vec::new());
    let (_keep_open, input) = tokio::io::duplex(64);

    let mut driver = InteractiveDriver::new(BufReader::new(input), Vec::new())
        .with_interrupt(|| Box::pin(async {}));
    let exit = driver
        .run(&service(&provider, &tools))
        .await
        .expect("driver io");

    assert_eq!(exit, DriverExit::Interrupted);
    assert_eq!(exit.exit_code(), 0);
}

#[tokio::test]
async fn announce_lists_server_tools() {
    let server = ServerDetails {
        info: ServerInfo {
            name: "weather".to_string(),
            version: "1.0.0".to_string(),
        },
        ..ServerDetails::default()
    };
    let tools = vec![
        ToolDescriptor::new("get_alerts", "Alerts", json!({"type": "object"})),
        ToolDescriptor::new("get_forecast", "Forecast", json!({"type": "object"})),
    ];

    let mut driver = InteractiveDriver::new(&b""[..], Vec::new());
    driver.announce(&server, &tools).await.expect("announce");
    let (_, output) = driver.into_parts();

    assert_eq!(
        String::from_utf8(output).expect("utf8 output"),
        "\nConnected to weather with tools: [get_alerts, get_forecast]\n"
    );
}

#[tokio::test]
async fn missing_server_script_fails_before_the_prompt() {
    let cli = CliArgs {
        server_script: PathBuf::from("definitely/not/here.py"),
        model: None,
        max_tokens: None,
        max_turns: None,
        tool_timeout: None,
        env_file: PathBuf::from(".env"),
        log_level: None,
    };
    let mut process = EnvMap::new();
    process.insert("ANTHROPIC_API_KEY".to_string(), "sk-ant-test".to_string());
    let config = ClientConfig::resolve(&cli, &EnvMap::new(), &process).expect("config");

    let mut driver = InteractiveDriver::new(&b"quit\n"[..], Vec::new());
    let error = tether::run_client(config, &mut driver)
        .await
        .expect_err("missing script should fail");
    let (_, output) = driver.into_parts();

    assert_eq!(error.kind, ClientErrorKind::Connect);
    assert!(output.is_empty());
}

#[tokio::test]
async fn unsupported_script_is_a_connect_error() {
    let cli = CliArgs {
        server_script: PathBuf::from("server.rb"),
        model: None,
        max_tokens: None,
        max_turns: None,
        tool_timeout: None,
        env_file: PathBuf::from(".env"),
        log_level: None,
    };
    let mut process = EnvMap::new();
    process.insert("ANTHROPIC_API_KEY".to_string(), "sk-ant-test".to_string());
    let config = ClientConfig::resolve(&cli, &EnvMap::new(), &process).expect("config");

    let mut driver = InteractiveDriver::new(&b""[..], Vec::new());
    let error = tether::run_client(config, &mut driver)
        .await
        .expect_err("ruby script should be refused");

    assert_eq!(error.kind, ClientErrorKind::Connect);
    assert!(error.message.contains("UnsupportedScript"));
}
