use crate::tools::http_client;
use crate::traits::Tool;
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    #[serde(default)]
    weather: Vec<Condition>,
    main: Readings,
    #[serde(default)]
    wind: Wind,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct Readings {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Default, Deserialize)]
struct Wind {
    #[serde(default)]
    speed: f64,
}

pub struct OpenWeatherMapTool {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenWeatherMapTool {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            api_key: api_key.into(),
            base_url: "https://api.openweathermap.org".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn describe(location: &str, current: &CurrentWeather) -> String {
        let status = current
            .weather
            .first()
            .map(|c| c.description.as_str())
            .unwrap_or("unknown");
        format!(
            "Current weather in {}: {}°C, {}, Humidity: {}%, Wind Speed: {} m/s",
            location, current.main.temp, status, current.main.humidity, current.wind.speed
        )
    }
}

#[async_trait]
impl Tool for OpenWeatherMapTool {
    fn name(&self) -> &str {
        "openweathermap"
    }

    fn description(&self) -> &str {
        "A wrapper around OpenWeatherMap API. Useful for fetching current weather information \
         for a specified location. Input should be a location string (e.g. London,GB)."
    }

    async fn invoke(&self, input: &str) -> anyhow::Result<String> {
        let location = input.trim();
        if location.is_empty() {
            anyhow::bail!("A location is required");
        }

        let response = self
            .client
            .get(format!("{}/data/2.5/weather", self.base_url))
            .query(&[
                ("q", location),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .context("OpenWeatherMap request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenWeatherMap error ({}): {}", status, body);
        }

        let current: CurrentWeather = response
            .json()
            .await
            .context("OpenWeatherMap returned an unreadable response")?;
        Ok(Self::describe(location, &current))
    }
}
