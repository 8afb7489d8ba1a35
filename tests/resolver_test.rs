//! Integration tests for AnswerResolver using wiremock
//!
//! These tests validate endpoint rotation, timeouts, caching and the
//! deterministic fallback against mock servers.

mod common;

use chrono::{Duration as ChronoDuration, NaiveDate};
use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wordday::resolver::{fallback_record, AnswerResolver};

use common::{clock_at, resolver_config};

fn jan15() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
}

fn template(server: &MockServer, prefix: &str) -> String {
    format!("{}/{prefix}/{{date}}.json", server.uri())
}

/// First endpoint answers, the record is authoritative and cached
#[tokio::test]
async fn test_resolve_from_first_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/2024-01-15.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"solution": "crane", "days_since_launch": 940})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let resolver =
        AnswerResolver::new(resolver_config(vec![template(&server, "v2")]), clock_at(12, 0))
            .unwrap();

    let first = resolver.resolve_today().await;
    assert_eq!(first.word, "CRANE");
    assert_eq!(first.sequence_number, 940);
    assert_eq!(first.date, jan15());
    assert_eq!(first.source, "127.0.0.1");
    assert!(first.is_authoritative);

    // Served from cache, no second request
    let second = resolver.resolve_today().await;
    assert_eq!(second, first);

    let status = resolver.status();
    assert_eq!(status.live_resolutions, 1);
    assert_eq!(status.remote_successes, 1);
    assert_eq!(status.fallbacks, 0);
}

/// A failing endpoint moves the rotation pointer to the next one
#[tokio::test]
async fn test_rotation_advances_on_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/primary/.*"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/secondary/.*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"word": "SLATE"})))
        .expect(2)
        .mount(&server)
        .await;

    let resolver = AnswerResolver::new(
        resolver_config(vec![
            template(&server, "primary"),
            template(&server, "secondary"),
        ]),
        clock_at(12, 0),
    )
    .unwrap();

    let answer = resolver.resolve_today().await;
    assert_eq!(answer.word, "SLATE");
    assert_eq!(resolver.rotation_index(), 1);

    // The next live resolution starts at the endpoint that worked
    let refreshed = resolver.force_refresh().await;
    assert_eq!(refreshed.word, "SLATE");
    assert_eq!(resolver.rotation_index(), 1);
}

/// Every attempt failing ends in the fallback with the short TTL
#[tokio::test]
async fn test_exhaustion_falls_back() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/a/.*"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/b/.*"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let clock = clock_at(12, 0);
    let resolver = AnswerResolver::new(
        resolver_config(vec![template(&server, "a"), template(&server, "b")]),
        clock.clone(),
    )
    .unwrap();

    let answer = resolver.resolve_today().await;
    assert_eq!(answer, fallback_record(jan15()));
    assert!(!answer.is_authoritative);
    assert_eq!(resolver.status().fallbacks, 1);

    // Fallback entries expire after fallback_ttl_secs (300), not cache_ttl_secs
    clock.advance(ChronoDuration::seconds(301));
    assert!(resolver.cache().get("answer:2024-01-15").is_none());
}

/// A slow endpoint cannot hold resolution past the overall budget
#[tokio::test]
async fn test_overall_timeout_bounds_resolution() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"solution": "crane"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut config = resolver_config(vec![template(&server, "slow")]);
    config.request_timeout_ms = 5_000;
    config.overall_timeout_ms = 300;
    let resolver = AnswerResolver::new(config, clock_at(12, 0)).unwrap();

    let started = Instant::now();
    let answer = resolver.resolve_today().await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!answer.is_authoritative);
    assert_eq!(answer.word, fallback_record(jan15()).word);
}

/// An endpoint cut off by the overall budget loses its place in the rotation
#[tokio::test]
async fn test_overall_timeout_advances_rotation() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/hang/.*"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"solution": "crane"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/fast/.*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("pious")))
        .mount(&server)
        .await;

    let mut config = resolver_config(vec![template(&server, "hang"), template(&server, "fast")]);
    config.request_timeout_ms = 1_000;
    config.overall_timeout_ms = 300;
    let resolver = AnswerResolver::new(config, clock_at(12, 0)).unwrap();

    let first = resolver.resolve_today().await;
    assert!(!first.is_authoritative);
    assert_eq!(resolver.rotation_index(), 1);

    let refreshed = resolver.force_refresh().await;
    assert_eq!(refreshed.word, "PIOUS");
    assert!(refreshed.is_authoritative);
}

/// Per-request timeout moves on to the next endpoint
#[tokio::test]
async fn test_request_timeout_rotates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/slow/.*"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"solution": "crane"}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/fast/.*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("pious")))
        .mount(&server)
        .await;

    let mut config = resolver_config(vec![template(&server, "slow"), template(&server, "fast")]);
    config.request_timeout_ms = 200;
    config.overall_timeout_ms = 2_000;
    let resolver = AnswerResolver::new(config, clock_at(12, 0)).unwrap();

    let answer = resolver.resolve_today().await;
    assert_eq!(answer.word, "PIOUS");
    assert!(answer.is_authoritative);
}

/// Forced refresh performs exactly one extra remote call
#[tokio::test]
async fn test_force_refresh_call_count() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "crane"})))
        .expect(2)
        .mount(&server)
        .await;

    let resolver =
        AnswerResolver::new(resolver_config(vec![template(&server, "v2")]), clock_at(12, 0))
            .unwrap();

    resolver.resolve_today().await;
    resolver.resolve_today().await;
    let refreshed = resolver.force_refresh().await;

    assert_eq!(refreshed.word, "CRANE");
    assert_eq!(resolver.status().live_resolutions, 2);
}

/// Nested payloads are accepted, garbage words are not
#[tokio::test]
async fn test_response_shapes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/nested/.*"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": {"word": "slate", "puzzle_number": 940}})),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/garbage/.*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"solution": "12345"})))
        .mount(&server)
        .await;

    let nested =
        AnswerResolver::new(resolver_config(vec![template(&server, "nested")]), clock_at(12, 0))
            .unwrap();
    assert_eq!(nested.resolve_today().await.word, "SLATE");

    let garbage =
        AnswerResolver::new(resolver_config(vec![template(&server, "garbage")]), clock_at(12, 0))
            .unwrap();
    let answer = garbage.resolve_today().await;
    assert!(!answer.is_authoritative);
}

/// Just after midnight the previous day's answer is served until refreshed
#[tokio::test]
async fn test_rollover_serves_pinned_day() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/v2/.*\.json$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"solution": "crane"})))
        .expect(1)
        .mount(&server)
        .await;

    let clock = clock_at(23, 59);
    let resolver =
        AnswerResolver::new(resolver_config(vec![template(&server, "v2")]), clock.clone())
            .unwrap();

    let before = resolver.resolve_today().await;
    assert_eq!(before.date, jan15());

    clock.advance(ChronoDuration::minutes(2));
    assert_eq!(resolver.today(), NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());

    let after = resolver.resolve_today().await;
    assert_eq!(after, before);
    assert_eq!(resolver.pinned_day(), Some(jan15()));
}
