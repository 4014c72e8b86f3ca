use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use weather_agent::config::{
    AppConfig, WeatherBackend, AGENT_DESCRIPTION, AGENT_INSTRUCTION, AGENT_NAME, APP_NAME,
    DEMO_QUERIES, SESSION_ID, USER_ID,
};
use weather_agent::conversation::{is_rate_limit_error, ConversationContext};
use weather_agent::llm::{create_provider, Agent, FunctionRegistry};
use weather_agent::runtime::{InMemorySessionService, Runner};
use weather_agent::weather::{self, HttpWeatherLookup, StaticWeatherTable, WeatherLookup};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weather_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        model = ?config.agent_model,
        weather_backend = %config.weather_backend,
        "Configuration loaded"
    );

    let lookup = weather_lookup(&config)?;

    if config.weather_backend.runs_startup_diagnostics() {
        for city in ["nairobi", "new york"] {
            let result = lookup.lookup(city).await;
            tracing::debug!(city, ?result, "Weather lookup");
        }
    }

    let (Some(model), Some(backend)) = (config.agent_model, config.gemini_backend) else {
        tracing::warn!("AGENT_MODEL is not set; weather agent disabled");
        return Ok(());
    };

    let mut registry = FunctionRegistry::new();
    weather::tool::register(&mut registry, lookup)?;
    let declarations = registry.declarations();

    let provider = create_provider(model.clone(), backend)
        .await
        .context("Failed to create LLM provider")?;
    let agent = Agent::new(AGENT_NAME, provider, Box::new(registry), declarations)
        .with_description(AGENT_DESCRIPTION)
        .with_instruction(AGENT_INSTRUCTION);
    tracing::info!(agent = AGENT_NAME, %model, "Agent created");

    let session_service = Arc::new(InMemorySessionService::new());
    let runner = Runner::new(agent, APP_NAME, session_service);
    let context = ConversationContext::initialize(runner, USER_ID, SESSION_ID).await?;

    for query in DEMO_QUERIES {
        println!("\n>>> User query: {}", query);
        match context.run_turn(query).await {
            Ok(answer) => println!("<<< Agent response: {}", answer),
            Err(e) => {
                if is_rate_limit_error(&e) {
                    tracing::error!(error = %e, retry_after = ?e.retry_after(), "Rate limited by the model provider");
                } else {
                    tracing::error!(error = %e, "Conversation turn failed");
                }
                return Err(e.into());
            }
        }
    }

    Ok(())
}

fn weather_lookup(config: &AppConfig) -> Result<Arc<dyn WeatherLookup>> {
    let lookup: Arc<dyn WeatherLookup> = match config.weather_backend {
        WeatherBackend::Live => Arc::new(
            HttpWeatherLookup::with_base_url(config.weather_api_url.as_str())
                .context("Failed to build weather HTTP client")?,
        ),
        WeatherBackend::Mock => Arc::new(StaticWeatherTable),
    };
    Ok(lookup)
}
