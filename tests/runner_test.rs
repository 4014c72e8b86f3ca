//! End-to-end turns through the runner with a scripted model

mod common;

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;

use common::{blocked_reply, get_weather_reply, text_reply, scripted_weather_agent};
use weather_agent::config::{APP_NAME, SESSION_ID, USER_ID};
use weather_agent::conversation::{run_turn, ConversationContext};
use weather_agent::llm::{ContentBlock, FinishReason, LlmError, Message, MessageRole};
use weather_agent::runtime::{AgentRuntime, InMemorySessionService, Runner, RuntimeError};

async fn runner_with_session(agent: weather_agent::llm::Agent) -> Runner {
    let service = Arc::new(InMemorySessionService::new());
    service
        .create_session(APP_NAME, USER_ID, SESSION_ID)
        .await
        .unwrap();
    Runner::new(agent, APP_NAME, service)
}

#[tokio::test]
async fn test_tool_call_round_trip() {
    let (agent, requests) = scripted_weather_agent(vec![
        get_weather_reply("London"),
        text_reply("It is rainy in London, around 20°C."),
    ]);
    let runner = runner_with_session(agent).await;

    let events: Vec<_> = runner
        .run_async(USER_ID, SESSION_ID, Message::user("What is the weather in London?"))
        .await
        .unwrap()
        .collect()
        .await;
    let events: Vec<_> = events.into_iter().map(Result::unwrap).collect();

    assert_eq!(events.len(), 3);
    assert!(matches!(
        &events[0].content.as_ref().unwrap().content[0],
        ContentBlock::ToolUse { name, .. } if name == "get_weather"
    ));
    let ContentBlock::ToolResult { content, is_error, .. } = &events[1].content.as_ref().unwrap().content[0]
    else {
        panic!("expected a tool result");
    };
    assert!(!is_error);
    assert!(content.contains(r#""status":"success""#));
    assert!(content.contains("The weather in London is rainy"));
    assert!(events[2].is_final_response());
    assert!(events.iter().all(|e| e.invocation_id == events[0].invocation_id));
    assert!(events.iter().all(|e| e.author == "weather_agent_v1"));

    // The second model call sees the tool answer, attributed to the tool
    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    let last = requests[1].messages.last().unwrap();
    assert_eq!(last.role, MessageRole::Tool);
    assert!(matches!(&last.content[0], ContentBlock::ToolResult { name, .. } if name == "get_weather"));
    assert!(requests[0].system.as_deref().unwrap().contains("get_weather"));
    drop(requests);

    let session = runner
        .session_service()
        .get_session(APP_NAME, USER_ID, SESSION_ID)
        .await
        .unwrap();
    let session = session.lock().await;
    assert_eq!(session.messages.len(), 4);
    // The user's message plus the three yielded events
    assert_eq!(session.events.len(), 4);
    assert_eq!(session.events[0].author, "user");
    assert_eq!(session.last_update_time, session.events[3].timestamp);
}

#[tokio::test]
async fn test_unknown_city_is_reported_to_the_model() {
    let (agent, requests) = scripted_weather_agent(vec![
        get_weather_reply("Atlantis"),
        text_reply("Sorry, I don't have weather information for Atlantis."),
    ]);
    let runner = runner_with_session(agent).await;

    let answer = run_turn("What is the weather in Atlantis?", &runner, USER_ID, SESSION_ID)
        .await
        .unwrap();

    assert_eq!(answer, "Sorry, I don't have weather information for Atlantis.");
    let requests = requests.lock().unwrap();
    let ContentBlock::ToolResult { content, .. } = &requests[1].messages.last().unwrap().content[0] else {
        panic!("expected a tool result");
    };
    assert!(content.contains(r#""status":"error""#));
    assert!(content.contains("Weather information for Atlantis is not available."));
}

#[tokio::test]
async fn test_history_carries_across_turns() {
    let (agent, requests) = scripted_weather_agent(vec![
        get_weather_reply("Nairobi"),
        text_reply("Sunny, 25°C in Nairobi."),
        text_reply("Yes, it is still sunny."),
    ]);
    let context = ConversationContext::initialize(agent_runner(agent), USER_ID, SESSION_ID)
        .await
        .unwrap();

    assert_eq!(
        context.run_turn("What is the weather in Nairobi?").await.unwrap(),
        "Sunny, 25°C in Nairobi."
    );
    assert_eq!(
        context.run_turn("Is it still sunny?").await.unwrap(),
        "Yes, it is still sunny."
    );

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 3);
    // user, tool call, tool result, answer, second user message
    assert_eq!(requests[2].messages.len(), 5);
}

fn agent_runner(agent: weather_agent::llm::Agent) -> Runner {
    Runner::new(agent, APP_NAME, Arc::new(InMemorySessionService::new()))
}

#[tokio::test]
async fn test_safety_stop_escalates() {
    let (agent, _) = scripted_weather_agent(vec![blocked_reply(FinishReason::Safety)]);
    let runner = runner_with_session(agent).await;

    let answer = run_turn("What is the weather in London?", &runner, USER_ID, SESSION_ID)
        .await
        .unwrap();

    assert_eq!(answer, "Agent escalated: Response blocked by safety filters.");
}

#[tokio::test]
async fn test_iteration_limit_escalates() {
    let (agent, _) = scripted_weather_agent(vec![
        get_weather_reply("London"),
        get_weather_reply("London"),
    ]);
    let runner = runner_with_session(agent.with_max_iterations(2)).await;

    let answer = run_turn("What is the weather in London?", &runner, USER_ID, SESSION_ID)
        .await
        .unwrap();

    assert_eq!(
        answer,
        "Agent escalated: Agent stopped after 2 model calls without a final response."
    );
}

#[tokio::test]
async fn test_provider_rate_limit_becomes_runtime_error() {
    let (agent, _) = scripted_weather_agent(vec![Err(LlmError::RateLimitExceeded {
        retry_after: Some(Duration::from_secs(30)),
    })]);
    let runner = runner_with_session(agent).await;

    let err = run_turn("What is the weather in London?", &runner, USER_ID, SESSION_ID)
        .await
        .unwrap_err();

    assert!(matches!(err, RuntimeError::RateLimited { .. }));
    assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
    assert!(weather_agent::conversation::is_rate_limit_error(&err));
}

#[tokio::test]
async fn test_unknown_session() {
    let (agent, _) = scripted_weather_agent(vec![]);
    let runner = agent_runner(agent);

    let err = run_turn("hi", &runner, USER_ID, "missing").await.unwrap_err();

    assert!(matches!(err, RuntimeError::SessionNotFound { .. }));
}
