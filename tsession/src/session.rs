//! Stdio session with one tool-server subprocess speaking JSON-RPC.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tcommon::{BoxFuture, SessionId};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::protocol::{
    self, CallToolResult, Incoming, InitializeResult, JsonRpcError, JsonRpcNotification,
    JsonRpcReply, JsonRpcRequest, ListToolsResult, METHOD_CALL_TOOL, METHOD_CANCELLED,
    METHOD_INITIALIZE, METHOD_INITIALIZED, METHOD_LIST_TOOLS, METHOD_NOT_FOUND, METHOD_PING,
    PROTOCOL_VERSION,
};
use crate::{
    Interpreters, McpContent, ServerCommand, ServerDetails, SessionError, ToolDescriptor,
    ToolOutput, ToolSession,
};

type Reply = Result<Value, JsonRpcError>;

/// One framed line for the writer task, acknowledged once fully flushed.
struct Outgoing {
    line: String,
    written: oneshot::Sender<Result<(), SessionError>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub session_id: SessionId,
    pub client_name: String,
    pub client_version: String,
    pub interpreters: Interpreters,
    pub handshake_timeout: Duration,
    pub call_timeout: Duration,
    pub close_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: SessionId::new("tool-server"),
            client_name: "tether".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            interpreters: Interpreters::default(),
            handshake_timeout: Duration::from_secs(30),
            call_timeout: Duration::from_secs(120),
            close_grace: Duration::from_secs(2),
        }
    }
}

impl SessionConfig {
    pub fn with_session_id(mut self, session_id: impl Into<SessionId>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_client_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.client_name = name.into();
        self.client_version = version.into();
        self
    }

    pub fn with_interpreters(mut self, interpreters: Interpreters) -> Self {
        self.interpreters = interpreters;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_close_grace(mut self, grace: Duration) -> Self {
        self.close_grace = grace;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Ready,
    Closed,
}

/// State shared between the session handle and its reader task.
struct Shared {
    session_id: SessionId,
    state: Mutex<SessionState>,
    closed_by_client: AtomicBool,
    pending: Mutex<HashMap<u64, oneshot::Sender<Reply>>>,
    outbox: Mutex<Option<mpsc::UnboundedSender<Outgoing>>>,
}

impl Shared {
    fn new(session_id: SessionId, outbox: mpsc::UnboundedSender<Outgoing>) -> Self {
        Self {
            session_id,
            state: Mutex::new(SessionState::Connecting),
            closed_by_client: AtomicBool::new(false),
            pending: Mutex::new(HashMap::new()),
            outbox: Mutex::new(Some(outbox)),
        }
    }

    fn state(&self) -> SessionState {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(SessionState::Closed)
    }

    fn set_state(&self, next: SessionState) {
        if let Ok(mut state) = self.state.lock() {
            *state = next;
        }
    }

    /// Only a connecting session becomes ready; a reader that already saw EOF keeps it closed.
    fn mark_ready(&self) -> bool {
        match self.state.lock() {
            Ok(mut state) if *state == SessionState::Connecting => {
                *state = SessionState::Ready;
                true
            }
            _ => false,
        }
    }

    fn closed_error(&self) -> SessionError {
        if self.closed_by_client.load(Ordering::SeqCst) {
            SessionError::protocol("session is closed")
        } else {
            SessionError::transport("tool server connection is closed")
        }
    }

    fn ensure_ready(&self) -> Result<(), SessionError> {
        match self.state() {
            SessionState::Ready => Ok(()),
            SessionState::Connecting => Err(SessionError::protocol(
                "session handshake has not completed",
            )),
            SessionState::Closed => Err(self.closed_error()),
        }
    }

    fn pending(&self) -> Result<MutexGuard<'_, HashMap<u64, oneshot::Sender<Reply>>>, SessionError> {
        self.pending
            .lock()
            .map_err(|_| SessionError::transport("pending request table lock poisoned"))
    }

    /// Checked under the table lock so a closing reader cannot strand the waiter.
    fn register(&self, id: u64, waiter: oneshot::Sender<Reply>) -> Result<(), SessionError> {
        let mut pending = self.pending()?;
        if self.state() == SessionState::Closed {
            return Err(self.closed_error());
        }
        pending.insert(id, waiter);
        Ok(())
    }

    fn take_pending(&self, id: u64) -> Option<oneshot::Sender<Reply>> {
        self.pending.lock().ok()?.remove(&id)
    }

    /// Dropping the senders wakes every waiter with a closed-channel error.
    fn fail_pending(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.clear();
        }
    }

    async fn write_message<T: Serialize>(&self, message: &T) -> Result<(), SessionError> {
        let mut line = serde_json::to_string(message)
            .map_err(|err| SessionError::protocol(format!("failed to encode message: {err}")))?;
        line.push('\n');

        let (written, ack) = oneshot::channel();
        {
            let outbox = self
                .outbox
                .lock()
                .map_err(|_| SessionError::transport("outbox lock poisoned"))?;
            let sender = outbox.as_ref().ok_or_else(|| self.closed_error())?;
            sender
                .send(Outgoing { line, written })
                .map_err(|_| self.closed_error())?;
        }

        ack.await.map_err(|_| self.closed_error())?
    }

    /// The writer task drains what is queued, then drops stdin.
    fn close_outbox(&self) {
        if let Ok(mut outbox) = self.outbox.lock() {
            outbox.take();
        }
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), SessionError> {
        self.write_message(&JsonRpcNotification::new(method, params))
            .await
    }

    async fn send_cancelled(&self, id: u64, reason: &str) {
        let params = protocol::cancelled_params(id, reason);
        if let Err(error) = self.notify(METHOD_CANCELLED, Some(params)).await {
            debug!(session_id = %self.session_id, id, %error, "could not forward cancellation");
        }
    }
}

/// An in-flight request. Dropping it unanswered withdraws the request.
struct PendingRequest {
    shared: Arc<Shared>,
    id: u64,
    settled: bool,
}

impl PendingRequest {
    fn new(shared: Arc<Shared>, id: u64) -> Self {
        Self {
            shared,
            id,
            settled: false,
        }
    }

    fn settle(mut self) {
        self.settled = true;
    }

    async fn abandon(mut self, reason: &str) {
        self.settled = true;
        if self.shared.take_pending(self.id).is_some() {
            self.shared.send_cancelled(self.id, reason).await;
        }
    }
}

impl Drop for PendingRequest {
    fn drop(&mut self) {
        if self.settled || self.shared.take_pending(self.id).is_none() {
            return;
        }
        if self.shared.state() != SessionState::Ready {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let shared = Arc::clone(&self.shared);
        let id = self.id;
        runtime.spawn(async move {
            shared.send_cancelled(id, "request cancelled by client").await;
        });
    }
}

/// A connected tool server. Requests are correlated by id, so calls may overlap.
pub struct StdioSession {
    shared: Arc<Shared>,
    config: SessionConfig,
    server: ServerDetails,
    next_id: AtomicU64,
    child: tokio::sync::Mutex<Option<Child>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for StdioSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioSession")
            .field("session_id", &self.shared.session_id)
            .field("state", &self.shared.state())
            .field("server", &self.server)
            .finish_non_exhaustive()
    }
}

impl StdioSession {
    /// Launches `script` with the interpreter its extension selects, then performs the handshake.
    pub async fn connect(
        script: impl AsRef<Path>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let script = script.as_ref();
        let command = ServerCommand::for_script(script, &config.interpreters)?;
        if !script.is_file() {
            return Err(SessionError::connect(format!(
                "server script '{}' does not exist",
                script.display()
            )));
        }

        Self::connect_command(command, config).await
    }

    pub async fn connect_command(
        command: ServerCommand,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        info!(session_id = %config.session_id, %command, "launching tool server");

        let mut child = command.to_command().spawn().map_err(|err| {
            SessionError::connect(format!("failed to launch `{command}`: {err}"))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SessionError::connect("tool server stdin was not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SessionError::connect("tool server stdout was not captured"))?;

        let (outbox, queued) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(stdin, queued));
        let shared = Arc::new(Shared::new(config.session_id.clone(), outbox));
        let reader = tokio::spawn(read_loop(stdout, Arc::clone(&shared)));
        let handshake_timeout = config.handshake_timeout;

        let mut session = Self {
            shared,
            config,
            server: ServerDetails::default(),
            next_id: AtomicU64::new(1),
            child: tokio::sync::Mutex::new(Some(child)),
            reader: Mutex::new(Some(reader)),
        };

        let handshake = tokio::time::timeout(handshake_timeout, session.handshake()).await;
        let failure = match handshake {
            Ok(Ok(server)) => {
                if session.shared.mark_ready() {
                    info!(
                        session_id = %session.shared.session_id,
                        server = %server.info.name,
                        version = %server.info.version,
                        protocol = %server.protocol_version,
                        "tool server ready"
                    );
                    session.server = server;
                    return Ok(session);
                }
                SessionError::connect(format!(
                    "`{command}` closed its output right after the handshake"
                ))
            }
            Ok(Err(error)) => SessionError::connect(format!(
                "handshake with `{command}` failed: {}",
                error.message
            )),
            Err(_) => SessionError::connect(format!(
                "handshake with `{command}` timed out after {handshake_timeout:?}"
            )),
        };

        if let Err(error) = session.close().await {
            warn!(session_id = %session.shared.session_id, %error, "cleanup after failed handshake");
        }
        Err(failure)
    }

    pub fn session_id(&self) -> &SessionId {
        &self.shared.session_id
    }

    pub fn server(&self) -> &ServerDetails {
        &self.server
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Discovers every tool, following `nextCursor` until the listing is exhausted.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, SessionError> {
        self.shared.ensure_ready()?;

        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let reply = self
                .request(
                    METHOD_LIST_TOOLS,
                    protocol::list_tools_params(cursor.as_deref()),
                    Some(self.config.call_timeout),
                )
                .await?;
            let page: ListToolsResult = decode(
                METHOD_LIST_TOOLS,
                reply.map_err(|err| rejected(METHOD_LIST_TOOLS, &err))?,
            )?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if !next.is_empty() => {
                    if cursor.as_deref() == Some(next.as_str()) {
                        return Err(SessionError::protocol(format!(
                            "tool listing repeated cursor '{next}'"
                        )));
                    }
                    cursor = Some(next);
                }
                _ => break,
            }
        }

        debug!(session_id = %self.shared.session_id, count = tools.len(), "discovered tools");
        Ok(tools)
    }

    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, SessionError> {
        self.shared.ensure_ready()?;

        let reply = self
            .request(
                METHOD_CALL_TOOL,
                protocol::call_tool_params(name, arguments),
                Some(self.config.call_timeout),
            )
            .await
            .map_err(|err| err.with_tool_name(name))?;

        let result: CallToolResult = match reply {
            Ok(value) => decode(METHOD_CALL_TOOL, value).map_err(|err| err.with_tool_name(name))?,
            Err(err) => {
                return Err(SessionError::tool_execution(err.message).with_tool_name(name));
            }
        };

        let output = ToolOutput {
            content: result
                .content
                .into_iter()
                .map(McpContent::from_value)
                .collect(),
            structured: result.structured_content,
        };

        if result.is_error {
            let message = output.text();
            let message = if message.trim().is_empty() {
                "tool reported an error".to_string()
            } else {
                message
            };
            return Err(SessionError::tool_execution(message).with_tool_name(name));
        }

        Ok(output)
    }

    /// Releases the subprocess: closes stdin, waits out the grace period, then kills.
    pub async fn close(&self) -> Result<(), SessionError> {
        if self.shared.closed_by_client.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.shared.set_state(SessionState::Closed);
        self.shared.fail_pending();
        self.shared.close_outbox();

        let mut outcome = Ok(());
        let child = self.child.lock().await.take();
        if let Some(mut child) = child {
            match tokio::time::timeout(self.config.close_grace, child.wait()).await {
                Ok(Ok(status)) => {
                    info!(session_id = %self.shared.session_id, %status, "tool server exited");
                }
                Ok(Err(err)) => {
                    outcome = Err(SessionError::transport(format!(
                        "failed to reap tool server: {err}"
                    )));
                }
                Err(_) => {
                    warn!(
                        session_id = %self.shared.session_id,
                        grace = ?self.config.close_grace,
                        "tool server did not exit in time; killing it"
                    );
                    if let Err(err) = child.kill().await {
                        outcome = Err(SessionError::transport(format!(
                            "failed to kill tool server: {err}"
                        )));
                    }
                }
            }
        }

        self.abort_reader();
        outcome
    }

    fn abort_reader(&self) {
        if let Ok(mut reader) = self.reader.lock()
            && let Some(handle) = reader.take()
        {
            handle.abort();
        }
    }

    async fn handshake(&self) -> Result<ServerDetails, SessionError> {
        let params =
            protocol::initialize_params(&self.config.client_name, &self.config.client_version);
        let reply = self
            .request(METHOD_INITIALIZE, params, None)
            .await?;
        let result: InitializeResult = decode(
            METHOD_INITIALIZE,
            reply.map_err(|err| rejected(METHOD_INITIALIZE, &err))?,
        )?;

        if result.protocol_version != PROTOCOL_VERSION {
            debug!(
                session_id = %self.shared.session_id,
                requested = PROTOCOL_VERSION,
                negotiated = %result.protocol_version,
                "server answered with a different protocol version"
            );
        }

        self.shared.notify(METHOD_INITIALIZED, None).await?;

        Ok(ServerDetails {
            info: result.server_info,
            protocol_version: result.protocol_version,
            instructions: result.instructions,
        })
    }

    /// Without a `timeout` the caller bounds the wait; the handshake relies on this
    /// because `initialize` must never be cancelled.
    async fn request(
        &self,
        method: &str,
        params: Value,
        timeout: Option<Duration>,
    ) -> Result<Reply, SessionError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (waiter, response) = oneshot::channel();
        self.shared.register(id, waiter)?;
        let pending = PendingRequest::new(Arc::clone(&self.shared), id);

        debug!(session_id = %self.shared.session_id, id, method, "sending request");
        self.shared
            .write_message(&JsonRpcRequest::new(id, method, params))
            .await?;

        let reply = match timeout {
            Some(limit) => match tokio::time::timeout(limit, response).await {
                Ok(reply) => reply,
                Err(_) => {
                    pending.abandon("request timed out").await;
                    return Err(SessionError::timeout(format!(
                        "'{method}' received no response within {limit:?}"
                    )));
                }
            },
            None => response.await,
        };

        pending.settle();
        reply.map_err(|_| self.shared.closed_error())
    }
}

impl Drop for StdioSession {
    fn drop(&mut self) {
        self.abort_reader();
    }
}

impl ToolSession for StdioSession {
    fn list_tools<'a>(&'a self) -> BoxFuture<'a, Result<Vec<ToolDescriptor>, SessionError>> {
        Box::pin(StdioSession::list_tools(self))
    }

    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        arguments: Map<String, Value>,
    ) -> BoxFuture<'a, Result<ToolOutput, SessionError>> {
        Box::pin(StdioSession::call_tool(self, name, arguments))
    }
}

fn decode<T: DeserializeOwned>(method: &str, value: Value) -> Result<T, SessionError> {
    serde_json::from_value(value)
        .map_err(|err| SessionError::protocol(format!("malformed '{method}' result: {err}")))
}

fn rejected(method: &str, error: &JsonRpcError) -> SessionError {
    SessionError::protocol(format!(
        "server rejected '{method}' ({}): {}",
        error.code, error.message
    ))
}

/// Sole owner of the server's stdin. A line is always written whole, even when
/// the request that queued it has been dropped.
async fn write_loop(mut stdin: ChildStdin, mut queued: mpsc::UnboundedReceiver<Outgoing>) {
    while let Some(Outgoing { line, written }) = queued.recv().await {
        let result = write_line(&mut stdin, &line).await;
        let failed = result.is_err();
        let _ = written.send(result);
        if failed {
            break;
        }
    }
}

async fn write_line(stdin: &mut ChildStdin, line: &str) -> Result<(), SessionError> {
    stdin
        .write_all(line.as_bytes())
        .await
        .map_err(|err| SessionError::transport(format!("failed to write to tool server: {err}")))?;
    stdin
        .flush()
        .await
        .map_err(|err| SessionError::transport(format!("failed to flush tool server stdin: {err}")))
}

async fn read_loop(stdout: ChildStdout, shared: Arc<Shared>) {
    let mut lines = BufReader::new(stdout).lines();
    let reason = loop {
        match lines.next_line().await {
            Ok(Some(line)) => handle_line(&shared, &line).await,
            Ok(None) => break "tool server closed its output stream".to_string(),
            Err(err) => break format!("failed to read from tool server: {err}"),
        }
    };

    if !shared.closed_by_client.load(Ordering::SeqCst) {
        warn!(session_id = %shared.session_id, %reason, "tool server connection lost");
    }
    shared.set_state(SessionState::Closed);
    shared.fail_pending();
}

async fn handle_line(shared: &Shared, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    let value = match serde_json::from_str::<Value>(line) {
        Ok(value) => value,
        Err(error) => {
            warn!(session_id = %shared.session_id, %error, "ignoring non-JSON line from tool server");
            return;
        }
    };

    match protocol::classify(value) {
        Ok(Incoming::Response { id, outcome }) => match shared.take_pending(id) {
            Some(waiter) => {
                // The caller may have given up already.
                let _ = waiter.send(outcome);
            }
            None => {
                warn!(session_id = %shared.session_id, id, "dropping response for unknown request id");
            }
        },
        Ok(Incoming::Request { id, method }) => {
            let reply = if method == METHOD_PING {
                JsonRpcReply::result(id, json!({}))
            } else {
                debug!(session_id = %shared.session_id, %method, "declining server request");
                JsonRpcReply::error(
                    id,
                    JsonRpcError {
                        code: METHOD_NOT_FOUND,
                        message: format!("method '{method}' is not supported by this client"),
                        data: None,
                    },
                )
            };
            if let Err(error) = shared.write_message(&reply).await {
                debug!(session_id = %shared.session_id, %error, "could not answer server request");
            }
        }
        Ok(Incoming::Notification { method }) => {
            debug!(session_id = %shared.session_id, %method, "server notification");
        }
        Err(reason) => {
            warn!(session_id = %shared.session_id, %reason, "ignoring malformed message from tool server");
        }
    }
}
