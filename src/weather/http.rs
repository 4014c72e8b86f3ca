use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

use super::{WeatherLookup, WeatherObservation, WeatherResult};

/// Public wttr.in endpoint
pub const DEFAULT_WEATHER_API_URL: &str = "https://wttr.in";

/// Upper bound on one lookup, connect to last body byte
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Live lookup against a wttr.in-compatible JSON endpoint
///
/// Issues `GET {base_url}/{city}?format=j1` and builds the report from the
/// first entry of `current_condition`.
#[derive(Debug, Clone)]
pub struct HttpWeatherLookup {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_condition: Vec<CurrentCondition>,
}

#[derive(Debug, Deserialize)]
struct CurrentCondition {
    #[serde(rename = "temp_C")]
    temp_c: String,
    #[serde(rename = "feelslike_C", alias = "FeelsLikeC")]
    feels_like_c: String,
    humidity: String,
    #[serde(rename = "weatherDesc")]
    weather_desc: Vec<DescriptionValue>,
}

#[derive(Debug, Deserialize)]
struct DescriptionValue {
    value: String,
}

impl HttpWeatherLookup {
    /// Lookup against the public endpoint
    pub fn new() -> reqwest::Result<Self> {
        Self::with_base_url(DEFAULT_WEATHER_API_URL)
    }

    /// Lookup against another wttr.in-compatible server
    pub fn with_base_url(base_url: impl Into<String>) -> reqwest::Result<Self> {
        Ok(Self {
            client: build_client(LOOKUP_TIMEOUT)?,
            base_url: base_url.into(),
        })
    }

    /// Replace the [`LOOKUP_TIMEOUT`] bound on each lookup
    pub fn with_timeout(self, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            ..self
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base_url}/{city}?format=j1`, with the city percent-encoded as one segment
    fn request_url(&self, city: &str) -> Result<Url, String> {
        // URL parsing folds `.`/`..` segments (even percent-encoded) into the base path
        if city.chars().all(|c| c == '.') {
            return Err(format!("Invalid city name '{}'.", city));
        }

        let invalid = |reason: String| {
            format!("Invalid weather service URL '{}': {}", self.base_url, reason)
        };

        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot be a base".to_string()))?
            .pop_if_empty()
            .push(city);
        url.query_pairs_mut().append_pair("format", "j1");
        Ok(url)
    }
}

fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().timeout(timeout).build()
}

#[async_trait]
impl WeatherLookup for HttpWeatherLookup {
    async fn lookup(&self, city: &str) -> WeatherResult {
        let city = city.trim();
        if city.is_empty() {
            return WeatherResult::error("City must be non-empty string.");
        }

        let url = match self.request_url(city) {
            Ok(url) => url,
            Err(message) => return WeatherResult::error(message),
        };

        tracing::debug!(city, %url, "Fetching weather");
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(city, error = %e, "Weather request failed");
                return WeatherResult::error(format!(
                    "Failed to fetch weather for {}: {}",
                    city, e
                ));
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            tracing::warn!(city, status = status.as_u16(), "Weather service returned an error");
            return WeatherResult::error(format!(
                "Weather service returned status {} for {}.",
                status.as_u16(),
                city
            ));
        }

        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                return WeatherResult::error(format!(
                    "Failed to decode weather response for {}: {}",
                    city, e
                ))
            }
        };

        match parse_observation(city, body) {
            Ok(observation) => WeatherResult::Success {
                report: observation.report(),
                data: Some(observation),
            },
            Err(e) => WeatherResult::error(format!(
                "Failed to parse weather data for {}: {}",
                city, e
            )),
        }
    }
}

fn parse_observation(city: &str, body: serde_json::Value) -> Result<WeatherObservation, String> {
    let forecast: ForecastResponse = serde_json::from_value(body).map_err(|e| e.to_string())?;
    let current = forecast
        .current_condition
        .into_iter()
        .next()
        .ok_or("current_condition is empty")?;
    let description = current
        .weather_desc
        .into_iter()
        .next()
        .ok_or("weatherDesc is empty")?
        .value;

    Ok(WeatherObservation {
        city: city.to_string(),
        description: description.trim().to_string(),
        temp_c: current.temp_c,
        feels_like_c: current.feels_like_c,
        humidity: current.humidity,
    })
}

impl WeatherObservation {
    /// One-line, human-readable summary
    pub fn report(&self) -> String {
        format!(
            "The weather in {} is {} with a temperature of {}°C (feels like {}°C) and humidity of {}%.",
            self.city,
            self.description.to_lowercase(),
            self.temp_c,
            self.feels_like_c,
            self.humidity
        )
    }
}
