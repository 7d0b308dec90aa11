//! Weather lookup for EcoGarden
//!
//! Fetches current conditions from OpenWeatherMap and keeps each city's
//! snapshot in a short-lived in-memory cache.

pub mod cache;
pub mod lookup;
pub mod provider;
pub mod types;

pub use cache::{Clock, ManualClock, SystemClock, TtlCache};
pub use lookup::{cache_key, normalize_city, WeatherLookupCache};
pub use provider::{OpenWeatherProvider, WeatherSource};
pub use types::*;
