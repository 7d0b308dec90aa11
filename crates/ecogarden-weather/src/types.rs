use chrono::{DateTime, Utc};
use ecogarden_core::AppError;
use serde::{Deserialize, Serialize};

/// Minimal current-weather payload returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// City name as reported by the provider (e.g. "Paris")
    pub city: String,
    /// ISO country code as reported by the provider
    pub country: String,
    /// Short textual condition, in the requested language
    pub description: String,
    pub temperature_celsius: f64,
    /// When the snapshot was produced
    pub fetched_at: DateTime<Utc>,
}

/// Weather lookup errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LookupError {
    #[error("City name is required")]
    InvalidInput,
    #[error("Weather lookup failed: {0}")]
    LookupFailed(String),
    #[error("City not found: {0}")]
    NotFound(String),
}

impl LookupError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidInput => "Invalid data. A city is required.",
            Self::LookupFailed(_) => "Unable to retrieve weather data.",
            Self::NotFound(_) => "City not found. Check the name and try again.",
        }
    }

    /// Status an HTTP layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidInput => 400,
            Self::NotFound(_) => 404,
            Self::LookupFailed(_) => 502,
        }
    }
}

impl From<LookupError> for AppError {
    fn from(err: LookupError) -> Self {
        AppError::service(err.http_status(), err.to_string(), err.user_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(LookupError::InvalidInput.http_status(), 400);
        assert_eq!(LookupError::NotFound("atlantis".into()).http_status(), 404);
        assert_eq!(LookupError::LookupFailed("503".into()).http_status(), 502);
    }

    #[test]
    fn test_into_app_error() {
        let err: AppError = LookupError::NotFound("atlantis".into()).into();
        assert_eq!(err.http_status(), 404);
        assert_eq!(err.to_string(), "City not found: atlantis");
    }

    #[test]
    fn test_snapshot_serializes_temperature_field() {
        let snapshot = WeatherSnapshot {
            city: "Paris".into(),
            country: "FR".into(),
            description: "ciel dégagé".into(),
            temperature_celsius: 18.5,
            fetched_at: Utc::now(),
        };
        let json = serde_json::to_value(&snapshot).unwrap_or_default();
        assert_eq!(json["temperature_celsius"], 18.5);
        assert_eq!(json["country"], "FR");
    }
}
