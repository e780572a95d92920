//! Query orchestration: model turns interleaved with tool calls until the model stops asking.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde_json::{Map, Value};
use tcommon::QueryId;
use tprovider::{
    ContentBlock, ConversationMessage, DEFAULT_ANTHROPIC_MODEL, ModelProvider, ModelRequest,
    ToolDefinition,
};
use tsession::{NoopToolCallHooks, SessionErrorKind, ToolCallHooks, ToolSession};

use crate::{
    ChatError, ChatOptions, NoopQueryHooks, QueryHooks, QueryOutcome, ToolInvocation,
    TranscriptEntry, to_provider_tools,
};

pub const DEFAULT_MAX_TURNS: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatPolicy {
    /// Upper bound on model calls per query; `None` is unbounded.
    pub max_turns: Option<u32>,
    /// Send failed tool calls back to the model as error results instead of aborting.
    pub forward_tool_errors: bool,
}

impl Default for ChatPolicy {
    fn default() -> Self {
        Self {
            max_turns: Some(DEFAULT_MAX_TURNS),
            forward_tool_errors: false,
        }
    }
}

impl ChatPolicy {
    /// Zero lifts the bound.
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = (max_turns > 0).then_some(max_turns);
        self
    }

    pub fn with_forward_tool_errors(mut self, forward: bool) -> Self {
        self.forward_tool_errors = forward;
        self
    }
}

#[derive(Clone)]
pub struct ChatService {
    provider: Arc<dyn ModelProvider>,
    tools: Arc<dyn ToolSession>,
    options: ChatOptions,
    policy: ChatPolicy,
    query_hooks: Arc<dyn QueryHooks>,
    tool_hooks: Arc<dyn ToolCallHooks>,
    next_query: Arc<AtomicU64>,
}

pub struct ChatServiceBuilder {
    provider: Arc<dyn ModelProvider>,
    tools: Arc<dyn ToolSession>,
    options: ChatOptions,
    policy: ChatPolicy,
    query_hooks: Arc<dyn QueryHooks>,
    tool_hooks: Arc<dyn ToolCallHooks>,
}

impl ChatServiceBuilder {
    pub fn new(provider: Arc<dyn ModelProvider>, tools: Arc<dyn ToolSession>) -> Self {
        Self {
            provider,
            tools,
            options: ChatOptions::new(DEFAULT_ANTHROPIC_MODEL),
            policy: ChatPolicy::default(),
            query_hooks: Arc::new(NoopQueryHooks),
            tool_hooks: Arc::new(NoopToolCallHooks),
        }
    }

    pub fn options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.options.model = model.into();
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.options.max_tokens = max_tokens;
        self
    }

    pub fn policy(mut self, policy: ChatPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn max_turns(mut self, max_turns: u32) -> Self {
        self.policy = self.policy.with_max_turns(max_turns);
        self
    }

    pub fn forward_tool_errors(mut self, forward: bool) -> Self {
        self.policy.forward_tool_errors = forward;
        self
    }

    pub fn query_hooks(mut self, hooks: Arc<dyn QueryHooks>) -> Self {
        self.query_hooks = hooks;
        self
    }

    pub fn tool_hooks(mut self, hooks: Arc<dyn ToolCallHooks>) -> Self {
        self.tool_hooks = hooks;
        self
    }

    pub fn build(self) -> ChatService {
        ChatService {
            provider: self.provider,
            tools: self.tools,
            options: self.options,
            policy: self.policy,
            query_hooks: self.query_hooks,
            tool_hooks: self.tool_hooks,
            next_query: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl ChatService {
    pub fn builder(
        provider: Arc<dyn ModelProvider>,
        tools: Arc<dyn ToolSession>,
    ) -> ChatServiceBuilder {
        ChatServiceBuilder::new(provider, tools)
    }

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    pub fn policy(&self) -> ChatPolicy {
        self.policy
    }

    /// Answers one user query, running every tool the model asks for along the way.
    ///
    /// The conversation history lives only for the duration of the call; a failed query
    /// leaves nothing behind. Dropping the returned future cancels the in-flight model or
    /// tool call.
    pub async fn process_query(&self, query: &str) -> Result<QueryOutcome, ChatError> {
        let query_id = QueryId::new(format!(
            "q-{}",
            self.next_query.fetch_add(1, Ordering::Relaxed)
        ));
        let started = Instant::now();
        self.query_hooks.on_query_start(&query_id, query);

        let result = self.run_query(&query_id, query).await;
        match &result {
            Ok(outcome) => {
                self.query_hooks
                    .on_query_success(&query_id, outcome, started.elapsed());
            }
            Err(error) => {
                self.query_hooks
                    .on_query_failure(&query_id, error, started.elapsed());
            }
        }

        result
    }

    async fn run_query(&self, query_id: &QueryId, query: &str) -> Result<QueryOutcome, ChatError> {
        if query.trim().is_empty() {
            return Err(ChatError::invalid_request("query must not be empty"));
        }

        let catalog = self.tools.list_tools().await?;
        let tools = to_provider_tools(&catalog);
        tracing::debug!(query = %query_id, tools = tools.len(), "tool catalog fetched");

        let mut history = vec![ConversationMessage::user_text(query)];
        let mut outcome = QueryOutcome::new(query_id.clone());

        loop {
            let request = self.build_request(&history, &tools)?;
            let response = self.provider.complete(request).await?;
            outcome.model_calls += 1;
            outcome.usage.accumulate(response.usage);
            self.query_hooks
                .on_turn_complete(query_id, outcome.model_calls, &response);

            if response.has_tool_use()
                && let Some(max_turns) = self.policy.max_turns
                && outcome.model_calls >= max_turns
            {
                return Err(ChatError::turn_limit_exceeded(format!(
                    "model still requested tools after {max_turns} turns"
                )));
            }

            let mut assistant = Vec::with_capacity(response.content.len());
            let mut results = Vec::new();

            for block in response.content {
                match block {
                    ContentBlock::Text { text } => {
                        outcome.transcript.push(TranscriptEntry::Text(text.clone()));
                        assistant.push(ContentBlock::Text { text });
                    }
                    ContentBlock::ToolUse { id, name, input } => {
                        outcome.transcript.push(TranscriptEntry::ToolCall {
                            name: name.clone(),
                            arguments: input.clone(),
                        });
                        let result = self
                            .execute_tool(query_id, &id, &name, &input, &mut outcome)
                            .await?;
                        results.push(result);
                        assistant.push(ContentBlock::ToolUse { id, name, input });
                    }
                    ContentBlock::ToolResult { tool_use_id, .. } => {
                        return Err(ChatError::provider(format!(
                            "model response carried a tool_result block for '{tool_use_id}'"
                        )));
                    }
                }
            }

            if !assistant.is_empty() {
                history.push(ConversationMessage::assistant(assistant));
            }

            if results.is_empty() {
                outcome.history = history;
                return Ok(outcome);
            }

            history.push(ConversationMessage::tool_results(results));
        }
    }

    fn build_request(
        &self,
        history: &[ConversationMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelRequest, ChatError> {
        let mut builder = ModelRequest::builder(self.options.model.clone())
            .messages(history.to_vec())
            .max_tokens(self.options.max_tokens)
            .tools(tools.to_vec());

        if let Some(temperature) = self.options.temperature {
            builder = builder.temperature(temperature);
        }

        if let Some(system_prompt) = &self.options.system_prompt {
            builder = builder.system_prompt(system_prompt.clone());
        }

        Ok(builder.build()?)
    }

    async fn execute_tool(
        &self,
        query_id: &QueryId,
        tool_use_id: &str,
        name: &str,
        input: &Map<String, Value>,
        outcome: &mut QueryOutcome,
    ) -> Result<ContentBlock, ChatError> {
        let started = Instant::now();
        self.tool_hooks.on_call_start(query_id, name, input);

        match self.tools.call_tool(name, input.clone()).await {
            Ok(output) => {
                let elapsed = started.elapsed();
                self.tool_hooks
                    .on_call_success(query_id, name, &output, elapsed);

                let result = output.text();
                outcome.tool_calls.push(ToolInvocation {
                    tool_use_id: tool_use_id.to_string(),
                    name: name.to_string(),
                    arguments: input.clone(),
                    result: result.clone(),
                    is_error: false,
                    elapsed,
                });
                Ok(ContentBlock::tool_result(tool_use_id, result))
            }
            Err(error) => {
                let elapsed = started.elapsed();
                self.tool_hooks
                    .on_call_failure(query_id, name, &error, elapsed);

                if error.kind != SessionErrorKind::ToolExecution || !self.policy.forward_tool_errors
                {
                    return Err(error.into());
                }

                tracing::warn!(
                    query = %query_id,
                    tool = name,
                    error = %error.message,
                    "forwarding tool failure to the model"
                );
                outcome.tool_calls.push(ToolInvocation {
                    tool_use_id: tool_use_id.to_string(),
                    name: name.to_string(),
                    arguments: input.clone(),
                    result: error.message.clone(),
                    is_error: true,
                    elapsed,
                });
                Ok(ContentBlock::tool_error(tool_use_id, error.message))
            }
        }
    }
}
