//! Process configuration, read from the environment
//!
//! `.env` is loaded by the binary before [`AppConfig::from_env`] runs.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::llm::gemini::{GeminiBackend, GeminiModel};
use crate::weather::DEFAULT_WEATHER_API_URL;

pub const APP_NAME: &str = "weather_agent_app";
pub const USER_ID: &str = "user_001";
pub const SESSION_ID: &str = "session_001";

pub const AGENT_NAME: &str = "weather_agent_v1";
pub const AGENT_DESCRIPTION: &str = "Provides weather information for specific cities.";
pub const AGENT_INSTRUCTION: &str = "You are a helpful weather assistant. \
When the user asks for the weather in a specific city, use the 'get_weather' tool to find the information. \
If the tool returns an error, inform the user politely. \
If the tool is successful, present the weather report clearly.";

/// Questions asked in order by the binary
pub const DEMO_QUERIES: [&str; 3] = [
    "What is the weather in Nairobi?",
    "What is the weather in New York?",
    "What is the weather in London?",
];

const DEFAULT_GCP_LOCATION: &str = "us-central1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("AGENT_MODEL is set but no credentials are configured (set GOOGLE_API_KEY or GCP_PROJECT_ID)")]
    MissingCredentials,
}

/// Source of weather reports for the `get_weather` tool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WeatherBackend {
    /// wttr.in over HTTP
    #[default]
    Live,
    /// The built-in five-city table
    Mock,
}

impl WeatherBackend {
    /// Startup sample lookups only run against the local table, never the network
    pub fn runs_startup_diagnostics(self) -> bool {
        self == WeatherBackend::Mock
    }
}

impl FromStr for WeatherBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" | "http" => Ok(WeatherBackend::Live),
            "mock" | "static" => Ok(WeatherBackend::Mock),
            other => Err(format!("expected \"live\" or \"mock\", got \"{}\"", other)),
        }
    }
}

impl fmt::Display for WeatherBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeatherBackend::Live => f.write_str("live"),
            WeatherBackend::Mock => f.write_str("mock"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` disables the agent; only the lookup diagnostics run
    pub agent_model: Option<GeminiModel>,
    /// Always `Some` when `agent_model` is
    pub gemini_backend: Option<GeminiBackend>,
    pub weather_backend: WeatherBackend,
    pub weather_api_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let agent_model = match var("AGENT_MODEL") {
            Some(value) => Some(value.parse::<GeminiModel>().map_err(|e| {
                ConfigError::InvalidValue {
                    name: "AGENT_MODEL",
                    value: value.clone(),
                    reason: e.to_string(),
                }
            })?),
            None => None,
        };

        let gemini_backend = match agent_model {
            Some(_) => Some(gemini_backend(&var)?),
            None => None,
        };

        let weather_backend = match var("WEATHER_BACKEND") {
            Some(value) => value
                .parse()
                .map_err(|reason| ConfigError::InvalidValue {
                    name: "WEATHER_BACKEND",
                    value,
                    reason,
                })?,
            None => WeatherBackend::default(),
        };

        let weather_api_url =
            var("WEATHER_API_URL").unwrap_or_else(|| DEFAULT_WEATHER_API_URL.to_string());

        Ok(Self {
            agent_model,
            gemini_backend,
            weather_backend,
            weather_api_url,
        })
    }
}

/// An API key wins over Vertex AI settings
fn gemini_backend(var: &impl Fn(&str) -> Option<String>) -> Result<GeminiBackend, ConfigError> {
    if let Some(api_key) = var("GOOGLE_API_KEY") {
        return Ok(GeminiBackend::DeveloperApi { api_key });
    }

    match var("GCP_PROJECT_ID") {
        Some(project_id) => Ok(GeminiBackend::VertexAi {
            project_id,
            location: var("GCP_LOCATION").unwrap_or_else(|| DEFAULT_GCP_LOCATION.to_string()),
        }),
        None => Err(ConfigError::MissingCredentials),
    }
}
