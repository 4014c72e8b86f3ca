#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use weather_agent::config::{AGENT_INSTRUCTION, AGENT_NAME};
use weather_agent::llm::core::types::ContentBlockStart;
use weather_agent::llm::{
    Agent, ContentDelta, FinishReason, FunctionRegistry, GenerateRequest, LlmError, LlmProvider,
    LlmStream, StreamEvent, UsageMetadata,
};
use weather_agent::weather::{self, StaticWeatherTable};

/// One scripted model reply
pub type Reply = Result<Vec<StreamEvent>, LlmError>;

/// Provider that replays scripted replies in order and records every request
pub struct ScriptedProvider {
    replies: Mutex<Vec<Reply>>,
    requests: Arc<Mutex<Vec<GenerateRequest>>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Reply>) -> (Self, Arc<Mutex<Vec<GenerateRequest>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let mut replies = replies;
        replies.reverse();
        let provider = Self {
            replies: Mutex::new(replies),
            requests: Arc::clone(&requests),
        };
        (provider, requests)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn stream_generate(&self, request: GenerateRequest) -> Result<LlmStream, LlmError> {
        self.requests.lock().unwrap().push(request);
        let events = self
            .replies
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(LlmError::StreamError("script exhausted".to_string())))?;
        Ok(Box::pin(futures::stream::iter(events.into_iter().map(Ok))))
    }
}

pub fn text_reply(text: &str) -> Reply {
    Ok(vec![
        StreamEvent::ContentDelta {
            index: 0,
            delta: ContentDelta::TextDelta {
                text: text.to_string(),
            },
        },
        StreamEvent::MessageEnd {
            finish_reason: FinishReason::Stop,
            usage: UsageMetadata::new(12, 8),
        },
    ])
}

pub fn get_weather_reply(city: &str) -> Reply {
    Ok(vec![
        StreamEvent::ContentBlockStart {
            index: 0,
            block: ContentBlockStart::ToolUse {
                id: "call-1".to_string(),
                name: "get_weather".to_string(),
                signature: None,
            },
        },
        StreamEvent::ContentDelta {
            index: 0,
            delta: ContentDelta::ToolUseDelta {
                partial_json: serde_json::json!({ "city": city }).to_string(),
            },
        },
        StreamEvent::ContentBlockEnd { index: 0 },
        StreamEvent::MessageEnd {
            finish_reason: FinishReason::Stop,
            usage: UsageMetadata::default(),
        },
    ])
}

pub fn blocked_reply(reason: FinishReason) -> Reply {
    Ok(vec![StreamEvent::MessageEnd {
        finish_reason: reason,
        usage: UsageMetadata::default(),
    }])
}

/// The weather agent over the static table, talking to a scripted model
pub fn scripted_weather_agent(replies: Vec<Reply>) -> (Agent, Arc<Mutex<Vec<GenerateRequest>>>) {
    let (provider, requests) = ScriptedProvider::new(replies);
    let mut registry = FunctionRegistry::new();
    weather::tool::register(&mut registry, Arc::new(StaticWeatherTable)).unwrap();
    let declarations = registry.declarations();

    let agent = Agent::new(AGENT_NAME, Box::new(provider), Box::new(registry), declarations)
        .with_instruction(AGENT_INSTRUCTION);
    (agent, requests)
}
