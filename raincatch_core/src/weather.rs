//! Remote weather report parsing.

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct WeatherReport {
    #[serde(default)]
    pub weather: Vec<WeatherCondition>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WeatherCondition {
    pub main: Option<String>,
    pub description: Option<String>,
}

impl WeatherCondition {
    /// Only conditions carrying both fields are considered.
    pub fn is_rain(&self) -> bool {
        match (&self.main, &self.description) {
            (Some(main), Some(description)) => {
                main.to_lowercase() == "rain" || description.to_lowercase().contains("rain")
            }
            _ => false,
        }
    }
}

impl WeatherReport {
    pub fn reports_rain(&self) -> bool {
        self.weather.iter().any(WeatherCondition::is_rain)
    }
}
