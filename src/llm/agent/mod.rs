//! Tool-calling agent loop
//!
//! The agent:
//! - appends the user message to the caller's history
//! - calls the LLM and forwards its streaming events
//! - executes requested tool calls and feeds the results back
//! - loops until the model answers without calling a tool
//!
//! History lives with the caller (a session, usually) so one agent can serve
//! many conversations.

mod error;

pub use error::AgentError;

use crate::llm::core::{
    config::GenerationConfig,
    provider::LlmProvider,
    types::{
        ContentBlock, ContentBlockStart, ContentDelta, FinishReason, GenerateRequest, Message,
        MessageRole, StreamEvent, ToolDeclaration,
    },
};
use crate::llm::tools::executor::ToolExecutor;
use async_stream::stream;
use futures::stream::Stream;
use futures::StreamExt;
use std::pin::Pin;

/// Events emitted by the agent during execution
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// Raw LLM streaming event (text deltas, tool calls, etc.)
    LlmEvent(StreamEvent),

    /// Agent is executing a tool call
    ToolExecutionStarted {
        tool_use_id: String,
        name: String,
        input: serde_json::Value,
    },

    /// Tool execution completed successfully
    ToolExecutionCompleted {
        tool_use_id: String,
        name: String,
        result: String,
    },

    /// Tool execution failed with an error
    ToolExecutionFailed {
        tool_use_id: String,
        name: String,
        error: String,
    },

    /// Agent is calling the LLM (again, after tool execution when > 1)
    IterationStarted { iteration: usize },

    /// The model answered without requesting tools
    Completed {
        /// Accumulated text of the final model response (may be empty)
        text: String,
        finish_reason: FinishReason,
    },
}

pub type AgentStream<'a> = Pin<Box<dyn Stream<Item = Result<AgentEvent, AgentError>> + Send + 'a>>;

struct PartialToolUseAccumulator {
    id: String,
    name: String,
    signature: Option<String>,
    input: String,
}

/// An LLM-backed agent with a fixed set of tools
pub struct Agent {
    name: String,
    description: String,
    instruction: Option<String>,
    provider: Box<dyn LlmProvider>,
    tool_executor: Box<dyn ToolExecutor>,
    tool_declarations: Vec<ToolDeclaration>,
    config: GenerationConfig,
    max_iterations: usize,
}

impl Agent {
    /// Create a new agent with default settings
    pub fn new(
        name: impl Into<String>,
        provider: Box<dyn LlmProvider>,
        tool_executor: Box<dyn ToolExecutor>,
        tool_declarations: Vec<ToolDeclaration>,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            instruction: None,
            provider,
            tool_executor,
            tool_declarations,
            config: GenerationConfig::default(),
            max_iterations: 10,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// System instruction sent with every request
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the maximum number of LLM calls per run (default: 10)
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tool_declarations.iter().map(|d| d.name.as_str())
    }

    /// Process a new user message through the agent loop
    ///
    /// The stream emits `IterationStarted` before each LLM call, `LlmEvent`
    /// for every provider event, `ToolExecution*` around each tool call and a
    /// single `Completed` at the end. `history` receives the user message,
    /// every assistant message and every batch of tool results.
    pub fn run<'a>(&'a self, history: &'a mut Vec<Message>, user_message: Message) -> AgentStream<'a> {
        history.push(user_message);

        Box::pin(stream! {
            let mut iteration = 0;

            loop {
                iteration += 1;
                if iteration > self.max_iterations {
                    yield Err(AgentError::MaxIterationsReached(self.max_iterations));
                    return;
                }

                yield Ok(AgentEvent::IterationStarted { iteration });

                let request = GenerateRequest {
                    messages: history.clone(),
                    tools: Some(self.tool_declarations.clone()),
                    config: self.config.clone(),
                    system: self.instruction.clone(),
                };

                let mut llm_stream = match self.provider.stream_generate(request).await {
                    Ok(s) => s,
                    Err(e) => {
                        yield Err(AgentError::Llm(e));
                        return;
                    }
                };

                let mut text_content = String::new();
                let mut tool_uses = Vec::new();
                let mut current_tool_use: Option<PartialToolUseAccumulator> = None;
                let mut finish_reason = FinishReason::Stop;

                while let Some(event_result) = llm_stream.next().await {
                    let event = match event_result {
                        Ok(e) => e,
                        Err(e) => {
                            yield Err(AgentError::Llm(e));
                            return;
                        }
                    };

                    yield Ok(AgentEvent::LlmEvent(event.clone()));

                    match event {
                        StreamEvent::ContentBlockStart { block, .. } => match block {
                            ContentBlockStart::Text { text } => text_content.push_str(&text),
                            ContentBlockStart::ToolUse { id, name, signature } => {
                                current_tool_use = Some(PartialToolUseAccumulator {
                                    id,
                                    name,
                                    signature,
                                    input: String::new(),
                                });
                            }
                        },
                        StreamEvent::ContentDelta { delta, .. } => match delta {
                            ContentDelta::TextDelta { text } => text_content.push_str(&text),
                            ContentDelta::ToolUseDelta { partial_json } => {
                                if let Some(tool_use) = &mut current_tool_use {
                                    tool_use.input.push_str(&partial_json);
                                }
                            }
                        },
                        StreamEvent::ContentBlockEnd { .. } => {
                            if let Some(tool_use) = current_tool_use.take() {
                                match serde_json::from_str(&tool_use.input) {
                                    Ok(input) => tool_uses.push(ContentBlock::ToolUse {
                                        id: tool_use.id,
                                        name: tool_use.name,
                                        input,
                                        signature: tool_use.signature,
                                    }),
                                    Err(e) => {
                                        yield Err(AgentError::ToolInputParse(e));
                                        return;
                                    }
                                }
                            }
                        }
                        StreamEvent::MessageEnd { finish_reason: reason, .. } => {
                            finish_reason = reason;
                            break;
                        }
                        StreamEvent::Error { error } => {
                            yield Err(AgentError::Llm(
                                crate::llm::core::error::LlmError::StreamError(error),
                            ));
                            return;
                        }
                        StreamEvent::MessageStart { .. } => {}
                    }
                }

                let mut assistant_content = Vec::new();
                if !text_content.is_empty() {
                    assistant_content.push(ContentBlock::Text { text: text_content.clone() });
                }
                assistant_content.extend(tool_uses.iter().cloned());
                if !assistant_content.is_empty() {
                    history.push(Message {
                        role: MessageRole::Assistant,
                        content: assistant_content,
                    });
                }

                if tool_uses.is_empty() {
                    yield Ok(AgentEvent::Completed {
                        text: text_content,
                        finish_reason,
                    });
                    return;
                }

                let mut results = Vec::with_capacity(tool_uses.len());
                for block in tool_uses {
                    let ContentBlock::ToolUse { id, name, input, .. } = block else {
                        continue;
                    };

                    yield Ok(AgentEvent::ToolExecutionStarted {
                        tool_use_id: id.clone(),
                        name: name.clone(),
                        input: input.clone(),
                    });

                    match self.tool_executor.execute(id.clone(), name.clone(), input).await {
                        Ok(result) => {
                            yield Ok(AgentEvent::ToolExecutionCompleted {
                                tool_use_id: id.clone(),
                                name: name.clone(),
                                result: result.clone(),
                            });
                            results.push(ContentBlock::tool_result(id, name, result));
                        }
                        Err(error) => {
                            yield Ok(AgentEvent::ToolExecutionFailed {
                                tool_use_id: id.clone(),
                                name: name.clone(),
                                error: error.clone(),
                            });
                            results.push(ContentBlock::tool_error(id, name, error));
                        }
                    }
                }

                // One message per model turn keeps calls and responses paired
                history.push(Message::tool_results(results));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::core::error::LlmError;
    use crate::llm::core::provider::LlmStream;
    use crate::llm::core::types::UsageMetadata;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Replays one scripted response per call
    struct ScriptedProvider {
        responses: Vec<Vec<StreamEvent>>,
        requests: Arc<Mutex<Vec<GenerateRequest>>>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn stream_generate(&self, request: GenerateRequest) -> Result<LlmStream, LlmError> {
            let mut requests = self.requests.lock().unwrap();
            let index = requests.len();
            requests.push(request);

            let events = self
                .responses
                .get(index)
                .cloned()
                .ok_or_else(|| LlmError::StreamError("No more responses".to_string()))?;
            Ok(Box::pin(futures::stream::iter(events.into_iter().map(Ok))))
        }
    }

    struct FixedExecutor(Result<String, String>);

    #[async_trait]
    impl ToolExecutor for FixedExecutor {
        async fn execute(
            &self,
            _tool_use_id: String,
            _name: String,
            _arguments: serde_json::Value,
        ) -> Result<String, String> {
            self.0.clone()
        }
    }

    fn text_turn(text: &str) -> Vec<StreamEvent> {
        vec![
            StreamEvent::ContentDelta {
                index: 0,
                delta: ContentDelta::TextDelta {
                    text: text.to_string(),
                },
            },
            StreamEvent::MessageEnd {
                finish_reason: FinishReason::Stop,
                usage: UsageMetadata::new(10, 5),
            },
        ]
    }

    fn tool_turn(name: &str, args: &str) -> Vec<StreamEvent> {
        vec![
            StreamEvent::ContentBlockStart {
                index: 0,
                block: ContentBlockStart::ToolUse {
                    id: "call-1".to_string(),
                    name: name.to_string(),
                    signature: None,
                },
            },
            StreamEvent::ContentDelta {
                index: 0,
                delta: ContentDelta::ToolUseDelta {
                    partial_json: args.to_string(),
                },
            },
            StreamEvent::ContentBlockEnd { index: 0 },
            StreamEvent::MessageEnd {
                finish_reason: FinishReason::Stop,
                usage: UsageMetadata::default(),
            },
        ]
    }

    fn agent(
        responses: Vec<Vec<StreamEvent>>,
        executor: FixedExecutor,
    ) -> (Agent, Arc<Mutex<Vec<GenerateRequest>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let provider = ScriptedProvider {
            responses,
            requests: requests.clone(),
        };
        let agent = Agent::new("test_agent", Box::new(provider), Box::new(executor), vec![])
            .with_instruction("Be helpful");
        (agent, requests)
    }

    async fn collect(stream: AgentStream<'_>) -> Vec<Result<AgentEvent, AgentError>> {
        stream.collect().await
    }

    #[test]
    fn test_agent_defaults() {
        let (agent, _) = agent(vec![], FixedExecutor(Ok(String::new())));
        assert_eq!(agent.name(), "test_agent");
        assert_eq!(agent.max_iterations(), 10);
        assert_eq!(agent.with_max_iterations(3).max_iterations(), 3);
    }

    #[tokio::test]
    async fn test_text_only_turn_completes() {
        let (agent, requests) = agent(vec![text_turn("Hello!")], FixedExecutor(Ok(String::new())));
        let mut history = Vec::new();

        let events = collect(agent.run(&mut history, Message::user("Hi"))).await;

        match events.last().unwrap() {
            Ok(AgentEvent::Completed {
                text,
                finish_reason,
            }) => {
                assert_eq!(text, "Hello!");
                assert_eq!(*finish_reason, FinishReason::Stop);
            }
            other => panic!("Expected completion, got {:?}", other),
        }
        assert_eq!(history, vec![Message::user("Hi"), Message::assistant("Hello!")]);
        assert_eq!(
            requests.lock().unwrap()[0].system.as_deref(),
            Some("Be helpful")
        );
    }

    #[tokio::test]
    async fn test_tool_call_signature_is_kept_in_history() {
        let mut signed = tool_turn("get_weather", r#"{"city":"Paris"}"#);
        signed[0] = StreamEvent::ContentBlockStart {
            index: 0,
            block: ContentBlockStart::ToolUse {
                id: "call-1".to_string(),
                name: "get_weather".to_string(),
                signature: Some("sig-1".to_string()),
            },
        };
        let (agent, requests) = agent(
            vec![signed, text_turn("Cloudy.")],
            FixedExecutor(Ok(r#"{"status":"success"}"#.to_string())),
        );
        let mut history = Vec::new();

        collect(agent.run(&mut history, Message::user("Weather in Paris?"))).await;

        let requests = requests.lock().unwrap();
        match &requests[1].messages[1].content[0] {
            ContentBlock::ToolUse { signature, .. } => {
                assert_eq!(signature.as_deref(), Some("sig-1"))
            }
            other => panic!("Expected tool use, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tool_call_then_answer() {
        let (agent, requests) = agent(
            vec![
                tool_turn("get_weather", r#"{"city":"Paris"}"#),
                text_turn("It is cloudy in Paris."),
            ],
            FixedExecutor(Ok(r#"{"status":"success"}"#.to_string())),
        );
        let mut history = Vec::new();

        let events = collect(agent.run(&mut history, Message::user("Weather in Paris?"))).await;

        assert!(events.iter().any(|e| matches!(
            e,
            Ok(AgentEvent::ToolExecutionCompleted { name, .. }) if name == "get_weather"
        )));
        assert_eq!(requests.lock().unwrap().len(), 2);

        // user, assistant tool call, tool results, final answer
        assert_eq!(history.len(), 4);
        assert_eq!(history[2].role, MessageRole::Tool);
        match &history[2].content[0] {
            ContentBlock::ToolResult { name, is_error, .. } => {
                assert_eq!(name, "get_weather");
                assert!(!is_error);
            }
            other => panic!("Expected tool result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tool_failure_is_reported_to_model() {
        let (agent, _) = agent(
            vec![tool_turn("get_weather", "{}"), text_turn("Sorry.")],
            FixedExecutor(Err("bad arguments".to_string())),
        );
        let mut history = Vec::new();

        let events = collect(agent.run(&mut history, Message::user("?"))).await;

        assert!(events.iter().any(|e| matches!(
            e,
            Ok(AgentEvent::ToolExecutionFailed { error, .. }) if error == "bad arguments"
        )));
        assert!(matches!(
            &history[2].content[0],
            ContentBlock::ToolResult { is_error: true, .. }
        ));
    }

    #[tokio::test]
    async fn test_max_iterations() {
        let (agent, _) = agent(
            vec![tool_turn("loop", "{}"), tool_turn("loop", "{}")],
            FixedExecutor(Ok("{}".to_string())),
        );
        let agent = agent.with_max_iterations(2);
        let mut history = Vec::new();

        let events = collect(agent.run(&mut history, Message::user("go"))).await;

        assert!(matches!(
            events.last().unwrap(),
            Err(AgentError::MaxIterationsReached(2))
        ));
    }

    #[tokio::test]
    async fn test_invalid_tool_arguments() {
        let (agent, _) = agent(
            vec![tool_turn("get_weather", "{not json")],
            FixedExecutor(Ok("{}".to_string())),
        );
        let mut history = Vec::new();

        let events = collect(agent.run(&mut history, Message::user("go"))).await;

        assert!(matches!(
            events.last().unwrap(),
            Err(AgentError::ToolInputParse(_))
        ));
    }

    #[tokio::test]
    async fn test_provider_error_ends_stream() {
        let (agent, _) = agent(vec![], FixedExecutor(Ok(String::new())));
        let mut history = Vec::new();

        let events = collect(agent.run(&mut history, Message::user("go"))).await;

        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], Err(AgentError::Llm(LlmError::StreamError(_)))));
    }
}
