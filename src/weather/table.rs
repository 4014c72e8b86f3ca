use async_trait::async_trait;

use super::{WeatherLookup, WeatherResult};

const REPORTS: &[(&str, &str)] = &[
    (
        "nairobi",
        "The weather in Nairobi is sunny with a temperature of 25 degrees Celsius",
    ),
    (
        "new york",
        "The weather in New York is cloudy with a temperature of 15 degrees Celsius",
    ),
    (
        "london",
        "The weather in London is rainy with a temperature of 20 degrees Celsius",
    ),
    (
        "paris",
        "The weather in Paris is cloudy with a temperature of 10 degrees Celsius",
    ),
    (
        "cape town",
        "The weather in Cape Town is cloudy with a temperature of 15 degrees Celsius",
    ),
];

/// Fixed, offline weather reports for a handful of cities
///
/// Matching is case-insensitive and exact; surrounding whitespace is not
/// stripped, and blank input simply falls through to "not available".
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticWeatherTable;

impl StaticWeatherTable {
    pub fn get(&self, city: &str) -> WeatherResult {
        let normalized = city.to_lowercase();
        match REPORTS.iter().find(|(name, _)| *name == normalized) {
            Some((_, report)) => WeatherResult::success(*report),
            None => WeatherResult::error(format!(
                "Weather information for {} is not available.",
                city
            )),
        }
    }

    /// Cities with a report, lower-cased
    pub fn cities(&self) -> impl Iterator<Item = &'static str> {
        REPORTS.iter().map(|(name, _)| *name)
    }
}

#[async_trait]
impl WeatherLookup for StaticWeatherTable {
    async fn lookup(&self, city: &str) -> WeatherResult {
        let result = self.get(city);
        tracing::debug!(city, success = result.is_success(), "Static weather lookup");
        result
    }
}
