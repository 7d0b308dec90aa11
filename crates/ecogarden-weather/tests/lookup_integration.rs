//! Integration tests for WeatherLookupCache against a mock OpenWeatherMap server.

use std::sync::Arc;
use std::time::Duration;

use ecogarden_core::WeatherConfig;
use ecogarden_weather::{
    LookupError, ManualClock, OpenWeatherProvider, TtlCache, WeatherLookupCache,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn paris_body() -> serde_json::Value {
    serde_json::json!({
        "coord": { "lon": 2.35, "lat": 48.85 },
        "weather": [{ "id": 800, "main": "Clear", "description": "clear sky", "icon": "01d" }],
        "main": { "temp": 18.5, "feels_like": 17.9, "humidity": 52 },
        "sys": { "country": "FR" },
        "name": "Paris",
        "cod": 200
    })
}

fn config_for(server: &MockServer) -> WeatherConfig {
    WeatherConfig {
        api_key: "test-key".to_string(),
        base_url: server.uri(),
        ..WeatherConfig::default()
    }
}

fn lookup_with_clock(server: &MockServer, clock: Arc<ManualClock>) -> WeatherLookupCache {
    let provider = OpenWeatherProvider::new(&config_for(server)).unwrap();
    WeatherLookupCache::new(Arc::new(provider), Arc::new(TtlCache::with_clock(clock)))
}

#[tokio::test]
async fn test_lookup_sends_expected_query_and_parses_snapshot() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "paris"))
        .and(query_param("appid", "test-key"))
        .and(query_param("units", "metric"))
        .and(query_param("lang", "fr"))
        .respond_with(ResponseTemplate::new(200).set_body_json(paris_body()))
        .expect(1)
        .mount(&server)
        .await;

    let lookup = WeatherLookupCache::from_config(&config_for(&server)).unwrap();
    let snapshot = lookup.get("Paris").await.unwrap();

    assert_eq!(snapshot.city, "Paris");
    assert_eq!(snapshot.country, "FR");
    assert_eq!(snapshot.description, "clear sky");
    assert_eq!(snapshot.temperature_celsius, 18.5);
}

#[tokio::test]
async fn test_hit_within_ttl_makes_no_upstream_call() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(paris_body()))
        .expect(1)
        .mount(&server)
        .await;

    let clock = Arc::new(ManualClock::new());
    let lookup = lookup_with_clock(&server, clock.clone());

    let first = lookup.get(" Paris ").await.unwrap();
    clock.advance(Duration::from_secs(30));
    let second = lookup.get("paris").await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_entry_older_than_ttl_refetches_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(paris_body()))
        .expect(2)
        .mount(&server)
        .await;

    let clock = Arc::new(ManualClock::new());
    let lookup = lookup_with_clock(&server, clock.clone());

    lookup.get("Paris").await.unwrap();
    clock.advance(Duration::from_secs(61));
    lookup.get("Paris").await.unwrap();
    lookup.get("Paris").await.unwrap();
}

#[tokio::test]
async fn test_upstream_failure_is_not_cached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let lookup = lookup_with_clock(&server, Arc::new(ManualClock::new()));

    let first = lookup.get("Paris").await;
    let second = lookup.get("Paris").await;

    assert!(matches!(first, Err(LookupError::LookupFailed(_))));
    assert!(matches!(second, Err(LookupError::LookupFailed(_))));
    assert!(lookup.cache().is_empty());
}

#[tokio::test]
async fn test_unknown_city_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({ "cod": "404", "message": "city not found" })),
        )
        .mount(&server)
        .await;

    let lookup = lookup_with_clock(&server, Arc::new(ManualClock::new()));
    let result = lookup.get("Atlantis").await;

    assert_eq!(result, Err(LookupError::NotFound("atlantis".to_string())));
}

#[tokio::test]
async fn test_unparseable_body_is_lookup_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let lookup = lookup_with_clock(&server, Arc::new(ManualClock::new()));
    let result = lookup.get("Paris").await;

    assert!(matches!(result, Err(LookupError::LookupFailed(_))));
    assert!(lookup.cache().is_empty());
}

#[tokio::test]
async fn test_blank_city_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(paris_body()))
        .expect(0)
        .mount(&server)
        .await;

    let lookup = lookup_with_clock(&server, Arc::new(ManualClock::new()));

    assert_eq!(lookup.get("").await, Err(LookupError::InvalidInput));
    assert_eq!(lookup.get("   ").await, Err(LookupError::InvalidInput));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_lookups_issue_single_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(paris_body())
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let lookup = Arc::new(lookup_with_clock(&server, Arc::new(ManualClock::new())));

    let mut handles = Vec::new();
    for name in ["Paris", "paris", " PARIS", "paris ", "Paris"] {
        let lookup = lookup.clone();
        handles.push(tokio::spawn(async move { lookup.get(name).await }));
    }

    for handle in handles {
        let snapshot = handle.await.unwrap().unwrap();
        assert_eq!(snapshot.city, "Paris");
    }
}

#[tokio::test]
async fn test_slow_upstream_times_out_and_is_not_cached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(paris_body())
                .set_delay(Duration::from_secs(3)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let config = WeatherConfig {
        timeout_secs: 1,
        ..config_for(&server)
    };
    let provider = OpenWeatherProvider::new(&config).unwrap();
    let lookup = WeatherLookupCache::new(
        Arc::new(provider),
        Arc::new(TtlCache::with_clock(Arc::new(ManualClock::new()))),
    );

    let first = lookup.get("Paris").await;
    assert_eq!(
        first,
        Err(LookupError::LookupFailed("request timed out".to_string()))
    );
    assert!(lookup.cache().is_empty());

    // Nothing was stored, so the next call goes upstream again.
    let second = lookup.get("Paris").await;
    assert!(matches!(second, Err(LookupError::LookupFailed(_))));
    assert!(lookup.cache().is_empty());
}

#[tokio::test]
async fn test_connection_refused_is_lookup_failure() {
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };

    let config = WeatherConfig {
        api_key: "test-key".to_string(),
        base_url: uri,
        timeout_secs: 2,
        ..WeatherConfig::default()
    };
    let lookup = WeatherLookupCache::from_config(&config).unwrap();

    let result = lookup.get("Paris").await;
    assert!(matches!(result, Err(LookupError::LookupFailed(_))));
    assert!(lookup.cache().is_empty());
}
