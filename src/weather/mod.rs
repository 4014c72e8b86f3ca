//! Current-weather lookup by city name
//!
//! A lookup never fails with a Rust error: every failure is reported as a
//! [`WeatherResult::Error`] carrying a message that can be shown to the user
//! (or to the model, when the lookup runs as a tool).

mod http;
mod table;
pub mod tool;

pub use http::{HttpWeatherLookup, DEFAULT_WEATHER_API_URL, LOOKUP_TIMEOUT};
pub use table::StaticWeatherTable;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outcome of one lookup, serialized in the tool result shape
/// `{"status": "success", "report": ..}` / `{"status": "error", "error_message": ..}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WeatherResult {
    Success {
        report: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<WeatherObservation>,
    },
    Error {
        #[serde(rename = "error_message")]
        message: String,
    },
}

impl WeatherResult {
    pub fn success(report: impl Into<String>) -> Self {
        WeatherResult::Success {
            report: report.into(),
            data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        WeatherResult::Error {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WeatherResult::Success { .. })
    }

    /// The report on success, the error message otherwise
    pub fn message(&self) -> &str {
        match self {
            WeatherResult::Success { report, .. } => report,
            WeatherResult::Error { message } => message,
        }
    }
}

/// Current conditions as reported by the weather service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub city: String,
    pub description: String,
    pub temp_c: String,
    pub feels_like_c: String,
    pub humidity: String,
}

/// A source of current weather reports
#[async_trait]
pub trait WeatherLookup: Send + Sync {
    async fn lookup(&self, city: &str) -> WeatherResult;
}
