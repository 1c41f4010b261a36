//! Bounded tool-selection loop
//!
//! The agent runs a small Think → Act → Observe cycle: ask the backend for
//! a completion, execute any tool calls it makes, feed the results back,
//! and stop on the first plain-text answer. The iteration bound is the
//! only cancellation mechanism; a run that exhausts it returns
//! [`Error::IterationLimit`] and the caller decides what to do.

use std::collections::HashMap;
use std::sync::Arc;

use charla_ai::{ChatBackend, Context, Message, Usage};
use tokio::sync::broadcast;

use crate::{
    error::{Error, Result},
    events::AgentEvent,
    tool::{BoxedTool, ToolResult, to_api_tool},
};

/// Agent configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// System prompt
    pub system_prompt: Option<String>,
    /// Maximum reasoning iterations before giving up
    pub max_iterations: u32,
    /// Sampling temperature passed through to the backend
    pub temperature: Option<f32>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_iterations: 4,
            temperature: None,
        }
    }
}

/// The agent: a backend plus a set of tools it may invoke
pub struct Agent {
    config: AgentConfig,
    backend: Arc<dyn ChatBackend>,
    tools: Vec<BoxedTool>,
    event_tx: broadcast::Sender<AgentEvent>,
    /// Cached compiled JSON schema validators keyed by tool name
    schema_cache: HashMap<String, Arc<jsonschema::Validator>>,
}

impl Agent {
    /// Create a new agent
    pub fn new(config: AgentConfig, backend: Arc<dyn ChatBackend>) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            config,
            backend,
            tools: vec![],
            event_tx,
            schema_cache: HashMap::new(),
        }
    }

    /// Subscribe to agent events
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.event_tx.subscribe()
    }

    /// Get the agent config
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Add a tool
    pub fn add_tool(&mut self, tool: BoxedTool) {
        self.cache_tool_schema(&tool);
        self.tools.push(tool);
    }

    /// Set tools (replaces existing)
    pub fn set_tools(&mut self, tools: Vec<BoxedTool>) {
        self.schema_cache.clear();
        for tool in &tools {
            self.cache_tool_schema(tool);
        }
        self.tools = tools;
    }

    /// Get tool names
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Compile and cache the JSON schema validator for a tool.
    fn cache_tool_schema(&mut self, tool: &BoxedTool) {
        let schema = tool.parameters_schema();
        match jsonschema::validator_for(&schema) {
            Ok(validator) => {
                self.schema_cache
                    .insert(tool.name().to_string(), Arc::new(validator));
            }
            Err(e) => {
                tracing::warn!(
                    "Invalid tool parameter schema for '{}', skipping validation: {}",
                    tool.name(),
                    e
                );
            }
        }
    }

    /// Run the loop on a single query and return the final answer text
    pub async fn run(&self, input: &str) -> Result<String> {
        let _ = self.event_tx.send(AgentEvent::AgentStart);

        let mut context = Context {
            system_prompt: self.config.system_prompt.clone(),
            messages: vec![Message::user(input)],
            tools: self.tools.iter().map(|t| to_api_tool(t.as_ref())).collect(),
            temperature: self.config.temperature,
        };

        let mut turn = 0u32;
        let mut total_usage = Usage::default();
        let result = loop {
            if turn >= self.config.max_iterations {
                break Err(Error::IterationLimit {
                    iterations: self.config.max_iterations,
                });
            }
            turn += 1;

            let assistant = match self.backend.complete(&context).await {
                Ok(msg) => msg,
                Err(e) => break Err(e.into()),
            };

            let usage = match &assistant {
                Message::Assistant { metadata, .. } => metadata.usage,
                _ => Usage::default(),
            };
            total_usage.add(&usage);
            let _ = self.event_tx.send(AgentEvent::TurnEnd { turn, usage });

            let tool_calls: Vec<(String, String, serde_json::Value)> = assistant
                .tool_calls()
                .into_iter()
                .map(|(id, name, args)| (id.to_string(), name.to_string(), args.clone()))
                .collect();

            context.push(assistant.clone());

            if tool_calls.is_empty() {
                let answer = assistant.text();
                if answer.trim().is_empty() {
                    break Err(Error::EmptyResponse);
                }
                break Ok(answer);
            }

            for result in self.execute_tool_calls(tool_calls).await {
                context.push(result);
            }
        };

        match &result {
            Ok(_) => {
                let _ = self.event_tx.send(AgentEvent::AgentEnd {
                    total_turns: turn,
                    total_usage,
                });
            }
            Err(e) => {
                let _ = self.event_tx.send(AgentEvent::Error {
                    message: e.to_string(),
                });
            }
        }

        result
    }

    /// Execute tool calls in order, producing tool-result messages.
    async fn execute_tool_calls(
        &self,
        tool_calls: Vec<(String, String, serde_json::Value)>,
    ) -> Vec<Message> {
        let mut results = Vec::with_capacity(tool_calls.len());

        for (id, name, args) in tool_calls {
            let _ = self.event_tx.send(AgentEvent::ToolExecutionStart {
                tool_name: name.clone(),
                arguments: args.clone(),
            });

            let tool = self.tools.iter().find(|t| t.name() == name);
            let result = if let Some(tool) = tool {
                let validation_error = self
                    .schema_cache
                    .get(&name)
                    .and_then(|validator| validate_with_validator(&args, validator));

                if let Some(err) = validation_error {
                    ToolResult::error(err)
                } else {
                    tool.execute(args).await
                }
            } else {
                ToolResult::error(format!("Tool not found: {}", name))
            };

            let _ = self.event_tx.send(AgentEvent::ToolExecutionEnd {
                tool_name: name.clone(),
                result: result.content.clone(),
                is_error: result.is_error,
            });

            results.push(Message::tool_result(id, name, result.content, result.is_error));
        }

        results
    }
}

/// Validate tool arguments using a pre-compiled validator.
/// Returns `Some(error_message)` if validation fails, `None` if valid.
fn validate_with_validator(
    args: &serde_json::Value,
    validator: &jsonschema::Validator,
) -> Option<String> {
    let errors: Vec<String> = validator
        .iter_errors(args)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{}: {}", path, e)
            }
        })
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(format!(
            "Tool argument validation failed:\n{}",
            errors.join("\n")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use charla_ai::{AssistantMetadata, Content};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::tool::Tool;

    /// A mock backend that returns scripted assistant responses.
    struct MockBackend {
        responses: Mutex<Vec<Message>>,
        call_count: AtomicU32,
    }

    impl MockBackend {
        fn new(responses: Vec<Message>) -> Self {
            Self {
                responses: Mutex::new(responses),
                call_count: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for MockBackend {
        fn name(&self) -> &str {
            "mock"
        }

        async fn complete(&self, _context: &Context) -> charla_ai::Result<Message> {
            self.call_count.fetch_add(1, Ordering::Relaxed);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Ok(Message::assistant("done"))
            } else {
                Ok(responses.remove(0))
            }
        }
    }

    /// A counting tool with a fixed reply.
    struct CountingTool {
        tool_name: String,
        reply: String,
        call_count: Arc<AtomicU32>,
    }

    impl CountingTool {
        fn new(name: &str, reply: &str) -> (Self, Arc<AtomicU32>) {
            let count = Arc::new(AtomicU32::new(0));
            (
                Self {
                    tool_name: name.to_string(),
                    reply: reply.to_string(),
                    call_count: count.clone(),
                },
                count,
            )
        }
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn name(&self) -> &str {
            &self.tool_name
        }
        fn description(&self) -> &str {
            "A counting tool"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" }
                },
                "required": ["query"]
            })
        }
        async fn execute(&self, _arguments: serde_json::Value) -> ToolResult {
            self.call_count.fetch_add(1, Ordering::Relaxed);
            ToolResult::text(&self.reply)
        }
    }

    fn assistant_with_tool_call(name: &str, args: serde_json::Value) -> Message {
        Message::Assistant {
            content: vec![Content::tool_call("call_1", name, args)],
            metadata: AssistantMetadata::default(),
        }
    }

    fn make_agent(responses: Vec<Message>) -> Agent {
        Agent::new(
            AgentConfig {
                system_prompt: Some("pick a tool".into()),
                max_iterations: 3,
                temperature: None,
            },
            Arc::new(MockBackend::new(responses)),
        )
    }

    #[tokio::test]
    async fn test_plain_answer_without_tools() {
        let agent = make_agent(vec![Message::assistant("just an answer")]);
        let answer = agent.run("hola").await.unwrap();
        assert_eq!(answer, "just an answer");
    }

    #[tokio::test]
    async fn test_tool_call_then_answer() {
        let responses = vec![
            assistant_with_tool_call("lookup", serde_json::json!({"query": "Queen"})),
            Message::assistant("found it"),
        ];
        let mut agent = make_agent(responses);
        let (tool, count) = CountingTool::new("lookup", "result data");
        agent.add_tool(Arc::new(tool));

        let answer = agent.run("letra de Bohemian Rhapsody").await.unwrap();

        assert_eq!(answer, "found it");
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_iteration_limit() {
        // The backend keeps asking for the tool and never answers.
        let responses = vec![
            assistant_with_tool_call("lookup", serde_json::json!({"query": "a"})),
            assistant_with_tool_call("lookup", serde_json::json!({"query": "b"})),
            assistant_with_tool_call("lookup", serde_json::json!({"query": "c"})),
            assistant_with_tool_call("lookup", serde_json::json!({"query": "d"})),
        ];
        let mut agent = make_agent(responses);
        let (tool, count) = CountingTool::new("lookup", "more data");
        agent.add_tool(Arc::new(tool));

        let err = agent.run("go").await.unwrap_err();

        assert!(matches!(err, Error::IterationLimit { iterations: 3 }));
        assert_eq!(count.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn test_empty_answer_is_error() {
        let agent = make_agent(vec![Message::assistant("   \n")]);
        let err = agent.run("hola").await.unwrap_err();
        assert!(matches!(err, Error::EmptyResponse));
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_error_result() {
        let responses = vec![
            assistant_with_tool_call("no_such_tool", serde_json::json!({})),
            Message::assistant("recovered"),
        ];
        let agent = make_agent(responses);

        let answer = agent.run("go").await.unwrap();
        assert_eq!(answer, "recovered");
    }

    #[tokio::test]
    async fn test_schema_validation_rejects_bad_args() {
        // Arguments missing the required "query" field never reach the tool.
        let responses = vec![
            assistant_with_tool_call("lookup", serde_json::json!({"wrong": 1})),
            Message::assistant("gave up"),
        ];
        let mut agent = make_agent(responses);
        let (tool, count) = CountingTool::new("lookup", "data");
        agent.add_tool(Arc::new(tool));

        let answer = agent.run("go").await.unwrap();

        assert_eq!(answer, "gave up");
        assert_eq!(count.load(Ordering::Relaxed), 0, "tool must not run on invalid args");
    }

    #[tokio::test]
    async fn test_events_emitted() {
        let responses = vec![
            assistant_with_tool_call("lookup", serde_json::json!({"query": "x"})),
            Message::assistant("final"),
        ];
        let mut agent = make_agent(responses);
        let (tool, _count) = CountingTool::new("lookup", "data");
        agent.add_tool(Arc::new(tool));

        let mut rx = agent.subscribe();
        agent.run("go").await.unwrap();

        let mut saw_tool_start = false;
        let mut saw_end = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                AgentEvent::ToolExecutionStart { ref tool_name, .. } => {
                    assert_eq!(tool_name, "lookup");
                    saw_tool_start = true;
                }
                AgentEvent::AgentEnd { total_turns, .. } => {
                    assert_eq!(total_turns, 2);
                    saw_end = true;
                }
                _ => {}
            }
        }
        assert!(saw_tool_start);
        assert!(saw_end);
    }
}
