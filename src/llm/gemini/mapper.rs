//! Mapping between abstraction types and Gemini types

use uuid::Uuid;

use crate::llm::core::{
    config::GenerationConfig,
    types::{
        ContentBlock, ContentBlockStart, ContentDelta, FinishReason, GenerateRequest, Message,
        MessageMetadata, MessageRole, StreamEvent, ToolDeclaration, UsageMetadata,
    },
};

use super::types::{
    Content, FunctionCall, FunctionDeclaration, FunctionResponse, GeminiGenerationConfig,
    GenerateContentRequest, GenerateContentResponse, Part, SystemInstruction, Tool,
};

/// JSON Schema keywords that Gemini's OpenAPI-subset schema rejects
const UNSUPPORTED_SCHEMA_KEYS: &[&str] = &["$schema", "title", "definitions"];

/// Convert our abstraction request to Gemini's request format
pub fn to_gemini_request(request: GenerateRequest) -> GenerateContentRequest {
    let tools = request
        .tools
        .filter(|tools| !tools.is_empty())
        .map(|tools| {
            vec![Tool {
                function_declarations: tools
                    .into_iter()
                    .map(to_gemini_function_declaration)
                    .collect(),
            }]
        });

    GenerateContentRequest {
        contents: request.messages.into_iter().map(to_gemini_content).collect(),
        system_instruction: request.system.map(|text| SystemInstruction {
            parts: vec![Part::Text { text }],
        }),
        tools,
        generation_config: Some(to_gemini_generation_config(request.config)),
    }
}

fn to_gemini_content(message: Message) -> Content {
    let role = match message.role {
        MessageRole::Assistant => "model",
        // Function responses travel in the user role
        MessageRole::User | MessageRole::Tool => "user",
    };

    Content {
        role: role.to_string(),
        parts: message.content.into_iter().map(to_gemini_part).collect(),
    }
}

fn to_gemini_part(block: ContentBlock) -> Part {
    match block {
        ContentBlock::Text { text } => Part::Text { text },
        // Gemini has no call ids; calls and responses are matched by name and order
        ContentBlock::ToolUse {
            name,
            input,
            signature,
            ..
        } => Part::FunctionCall {
            function_call: FunctionCall { name, args: input },
            thought_signature: signature,
        },
        ContentBlock::ToolResult {
            name,
            content,
            is_error,
            ..
        } => Part::FunctionResponse {
            function_response: FunctionResponse {
                name,
                response: tool_response_object(content, is_error),
            },
        },
    }
}

/// Gemini requires the function response to be a JSON object
fn tool_response_object(content: String, is_error: bool) -> serde_json::Value {
    if is_error {
        return serde_json::json!({ "error": content });
    }
    match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(value @ serde_json::Value::Object(_)) => value,
        Ok(other) => serde_json::json!({ "result": other }),
        Err(_) => serde_json::json!({ "result": content }),
    }
}

fn to_gemini_function_declaration(tool: ToolDeclaration) -> FunctionDeclaration {
    FunctionDeclaration {
        name: tool.name,
        description: tool.description,
        parameters: sanitize_schema(tool.input_schema),
    }
}

/// Strip top-level JSON Schema metadata that Gemini refuses
fn sanitize_schema(mut schema: serde_json::Value) -> serde_json::Value {
    if let Some(object) = schema.as_object_mut() {
        for key in UNSUPPORTED_SCHEMA_KEYS {
            object.remove(*key);
        }
    }
    schema
}

fn to_gemini_generation_config(config: GenerationConfig) -> GeminiGenerationConfig {
    GeminiGenerationConfig {
        max_output_tokens: Some(config.max_tokens),
        temperature: config.temperature,
        top_p: config.top_p,
        top_k: config.top_k,
    }
}

/// Convert one Gemini response chunk to stream events
///
/// `current_index` numbers the content blocks across chunks of one response.
pub fn from_gemini_response(
    response: GenerateContentResponse,
    current_index: &mut usize,
) -> Vec<StreamEvent> {
    let usage = response
        .usage_metadata
        .map(|u| UsageMetadata {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        })
        .unwrap_or_default();

    let Some(candidate) = response.candidates.into_iter().next() else {
        // A blocked prompt yields no candidates at all
        return match response.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => vec![StreamEvent::MessageEnd {
                finish_reason: map_finish_reason(&reason),
                usage,
            }],
            None => Vec::new(),
        };
    };

    let mut events = Vec::new();
    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();

    for part in parts {
        match part {
            Part::Text { text } => {
                events.push(StreamEvent::ContentDelta {
                    index: *current_index,
                    delta: ContentDelta::TextDelta { text },
                });
            }
            Part::FunctionCall {
                function_call,
                thought_signature,
            } => {
                // Gemini sends each call whole, so start/delta/end come together
                events.push(StreamEvent::ContentBlockStart {
                    index: *current_index,
                    block: ContentBlockStart::ToolUse {
                        id: Uuid::new_v4().to_string(),
                        name: function_call.name,
                        signature: thought_signature,
                    },
                });
                events.push(StreamEvent::ContentDelta {
                    index: *current_index,
                    delta: ContentDelta::ToolUseDelta {
                        partial_json: function_call.args.to_string(),
                    },
                });
                events.push(StreamEvent::ContentBlockEnd {
                    index: *current_index,
                });
                *current_index += 1;
            }
            Part::FunctionResponse { .. } => {}
        }
    }

    if let Some(reason) = candidate.finish_reason {
        events.push(StreamEvent::MessageEnd {
            finish_reason: map_finish_reason(&reason),
            usage,
        });
    }

    events
}

fn map_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::MaxTokens,
        "SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST" | "SPII" => FinishReason::Safety,
        "RECITATION" => FinishReason::Recitation,
        other => FinishReason::Other(other.to_string()),
    }
}

/// Initial event of every response
pub fn create_message_start(message_id: String) -> StreamEvent {
    StreamEvent::MessageStart {
        message: MessageMetadata {
            id: message_id,
            role: MessageRole::Assistant,
        },
    }
}
