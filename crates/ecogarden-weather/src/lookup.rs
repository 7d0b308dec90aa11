//! Cached weather lookup by city name.

use ecogarden_core::WeatherConfig;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::TtlCache;
use crate::provider::{OpenWeatherProvider, WeatherSource};
use crate::types::{LookupError, WeatherSnapshot};

pub const CACHE_KEY_PREFIX: &str = "meteo_";
pub const CACHE_TAG: &str = "meteo";
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Trim and lowercase a city name. Returns `None` when nothing is left.
pub fn normalize_city(raw: &str) -> Option<String> {
    let normalized = raw.trim().to_lowercase();
    (!normalized.is_empty()).then_some(normalized)
}

/// Cache key for an already-normalized city name.
pub fn cache_key(normalized_city: &str) -> String {
    format!("{CACHE_KEY_PREFIX}{normalized_city}")
}

/// Weather lookups fronted by a short-lived per-city cache.
///
/// Equivalent city names (case, surrounding whitespace) share one entry.
/// Failed lookups are never cached and are not retried.
pub struct WeatherLookupCache {
    source: Arc<dyn WeatherSource>,
    cache: Arc<TtlCache<WeatherSnapshot>>,
    ttl: Duration,
}

impl WeatherLookupCache {
    pub fn new(source: Arc<dyn WeatherSource>, cache: Arc<TtlCache<WeatherSnapshot>>) -> Self {
        Self {
            source,
            cache,
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Build the OpenWeatherMap-backed lookup described by `config`.
    pub fn from_config(config: &WeatherConfig) -> Result<Self, LookupError> {
        let provider = OpenWeatherProvider::new(config)?;
        Ok(Self::new(Arc::new(provider), Arc::new(TtlCache::new())).with_ttl(config.ttl()))
    }

    pub async fn get(&self, city_name: &str) -> Result<WeatherSnapshot, LookupError> {
        let city = normalize_city(city_name).ok_or(LookupError::InvalidInput)?;
        let key = cache_key(&city);

        let source = &self.source;
        let city_ref = city.as_str();
        let result = self
            .cache
            .get_or_compute(&key, self.ttl, &[CACHE_TAG], || async move {
                source.fetch(city_ref).await
            })
            .await;

        match &result {
            Ok(snapshot) => tracing::debug!(
                "Weather for {}: {} {:.1}°C",
                city,
                snapshot.description,
                snapshot.temperature_celsius
            ),
            Err(e) => tracing::warn!("Weather lookup for {} failed: {}", city, e),
        }
        result
    }

    /// Drop every cached snapshot. Returns how many were removed.
    pub fn invalidate_all(&self) -> usize {
        self.cache.invalidate_tags(&[CACHE_TAG])
    }

    pub fn cache(&self) -> &TtlCache<WeatherSnapshot> {
        &self.cache
    }
}
