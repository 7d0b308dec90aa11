//! OpenWeatherMap current-weather client.

use async_trait::async_trait;
use chrono::Utc;
use ecogarden_core::WeatherConfig;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::instrument;

use crate::types::{LookupError, WeatherSnapshot};

const CURRENT_WEATHER_PATH: &str = "/data/2.5/weather";
const USER_AGENT: &str = "EcoGarden/0.1.0";

/// Anything that can produce a fresh snapshot for a normalized city name.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch(&self, city: &str) -> Result<WeatherSnapshot, LookupError>;
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    name: String,
    sys: SysSection,
    weather: Vec<ConditionSection>,
    main: MainSection,
}

#[derive(Debug, Deserialize)]
struct SysSection {
    country: String,
}

#[derive(Debug, Deserialize)]
struct ConditionSection {
    description: String,
}

#[derive(Debug, Deserialize)]
struct MainSection {
    temp: f64,
}

impl CurrentWeatherResponse {
    fn into_snapshot(self) -> Result<WeatherSnapshot, LookupError> {
        let description = self
            .weather
            .into_iter()
            .next()
            .map(|c| c.description)
            .ok_or_else(|| LookupError::LookupFailed("response has no weather condition".into()))?;

        Ok(WeatherSnapshot {
            city: self.name,
            country: self.sys.country,
            description,
            temperature_celsius: self.main.temp,
            fetched_at: Utc::now(),
        })
    }
}

/// HTTP client for the OpenWeatherMap `/data/2.5/weather` endpoint.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    client: Client,
    base_url: String,
    api_key: String,
    units: String,
    lang: String,
}

impl OpenWeatherProvider {
    pub fn new(config: &WeatherConfig) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| LookupError::LookupFailed(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            units: config.units.clone(),
            lang: config.lang.clone(),
        })
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherProvider {
    #[instrument(skip(self), level = "info")]
    async fn fetch(&self, city: &str) -> Result<WeatherSnapshot, LookupError> {
        let url = format!("{}{}", self.base_url, CURRENT_WEATHER_PATH);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", self.units.as_str()),
                ("lang", self.lang.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    "request timed out".to_string()
                } else if e.is_connect() {
                    format!("connection failed: {e}")
                } else {
                    format!("request failed: {e}")
                };
                tracing::warn!("Weather request failed: {}", reason);
                LookupError::LookupFailed(reason)
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!("Provider does not know city {:?}", city);
            return Err(LookupError::NotFound(city.to_string()));
        }
        if !status.is_success() {
            tracing::warn!("Weather provider returned status {}", status);
            return Err(LookupError::LookupFailed(format!(
                "provider returned status {}",
                status
            )));
        }

        let body: CurrentWeatherResponse = response.json().await.map_err(|e| {
            tracing::warn!("Weather response parse error: {}", e);
            LookupError::LookupFailed(format!("unparseable response: {e}"))
        })?;

        body.into_snapshot()
    }
}
