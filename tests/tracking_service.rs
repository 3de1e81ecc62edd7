//! Lookup orchestration tests: admission, breaker, cache and session lifetime.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use resi_tracker::resilience::BreakerState;
use resi_tracker::{TrackingError, TrackingRequest};

mod common;

use common::{build_service, sample_rows, wait_until, within, Behaviour, Options, ScriptedProvider};

fn request(resi: &str, courier: &str) -> TrackingRequest {
    TrackingRequest::new(resi, courier).unwrap()
}

#[tokio::test]
async fn rejects_beyond_capacity_without_touching_the_source() {
    let gate = Arc::new(Semaphore::new(0));
    let provider = ScriptedProvider::gated(Behaviour::Rows(sample_rows()), gate.clone());
    let service = build_service(
        provider.clone(),
        Options {
            max_concurrent: 2,
            ..Options::default()
        },
    );

    let mut handles = Vec::new();
    for resi in ["A1", "A2"] {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.track(&request(resi, "jne")).await
        }));
    }
    assert!(wait_until(|| provider.navigations() == 2).await);
    assert_eq!(service.admission().in_flight(), 2);

    let err = service.track(&request("A3", "jne")).await.unwrap_err();
    assert!(matches!(err, TrackingError::CapacityExceeded { .. }));
    assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));
    assert_eq!(provider.acquired(), 2);
    assert_eq!(service.breaker().failure_count(), 0);

    gate.add_permits(2);
    for handle in handles {
        let outcome = within(handle).await.unwrap().unwrap();
        assert_eq!(outcome.events.len(), 2);
    }
    assert_eq!(service.admission().in_flight(), 0);
    assert_eq!(provider.released(), 2);
}

#[tokio::test]
async fn breaker_opens_after_threshold_failures() {
    let provider = ScriptedProvider::new(Behaviour::FailNavigation);
    let service = build_service(provider.clone(), Options::default());

    for i in 0..5 {
        let err = service
            .track(&request(&format!("B{i}"), "jne"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "navigation_error");
    }
    assert_eq!(service.breaker().snapshot().state, BreakerState::Open);

    let err = service.track(&request("B5", "jne")).await.unwrap_err();
    assert!(matches!(err, TrackingError::CircuitOpen { .. }));
    assert!(err.retry_after().unwrap() <= Duration::from_secs(60));

    assert_eq!(provider.navigations(), 5);
    assert_eq!(provider.acquired(), 5);
    assert_eq!(provider.released(), 5);
    assert_eq!(service.admission().in_flight(), 0);
}

#[tokio::test]
async fn repeat_lookup_within_ttl_is_served_from_cache() {
    let provider = ScriptedProvider::new(Behaviour::Rows(sample_rows()));
    let service = build_service(provider.clone(), Options::default());

    let first = service.track(&request("123", "jne")).await.unwrap();
    let second = service.track(&request("123", "jne")).await.unwrap();

    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.events, second.events);
    assert_eq!(first.events[0].status, "DELIVERED");
    assert_eq!(provider.acquired(), 1);
    assert_eq!(provider.navigations(), 1);
}

#[tokio::test]
async fn failures_are_not_cached() {
    let provider = ScriptedProvider::new(Behaviour::FailNavigation);
    let service = build_service(provider.clone(), Options::default());

    assert!(service.track(&request("123", "jne")).await.is_err());

    provider.set_behaviour(Behaviour::Rows(sample_rows()));
    let outcome = service.track(&request("123", "jne")).await.unwrap();
    assert!(!outcome.cached);
    assert_eq!(provider.navigations(), 2);
    // One success pays back the one failure.
    assert_eq!(service.breaker().failure_count(), 0);
}

#[tokio::test]
async fn request_deadline_releases_session_and_counts_failure() {
    let provider = ScriptedProvider::new(Behaviour::Hang);
    let service = build_service(
        provider.clone(),
        Options {
            request_timeout: Duration::from_millis(100),
            step_timeout: Duration::from_secs(30),
            ..Options::default()
        },
    );

    let err = within(service.track(&request("123", "jne"))).await.unwrap_err();

    assert!(matches!(err, TrackingError::Timeout(_)));
    assert_eq!(provider.released(), 1);
    assert_eq!(service.admission().in_flight(), 0);
    assert_eq!(service.breaker().failure_count(), 1);
}

#[tokio::test]
async fn step_deadline_is_a_selector_failure() {
    let provider = ScriptedProvider::new(Behaviour::Hang);
    let service = build_service(
        provider.clone(),
        Options {
            request_timeout: Duration::from_secs(30),
            step_timeout: Duration::from_millis(50),
            ..Options::default()
        },
    );

    let err = within(service.track(&request("123", "jne"))).await.unwrap_err();

    assert_eq!(err.kind(), "selector_timeout");
    assert_eq!(provider.released(), 1);
    assert_eq!(service.breaker().failure_count(), 1);
}

#[tokio::test]
async fn cancelled_lookup_still_releases_everything() {
    let provider = ScriptedProvider::new(Behaviour::Hang);
    let service = build_service(
        provider.clone(),
        Options {
            request_timeout: Duration::from_secs(30),
            step_timeout: Duration::from_secs(30),
            ..Options::default()
        },
    );

    let task = {
        let service = service.clone();
        tokio::spawn(async move { service.track(&request("123", "jne")).await })
    };
    assert!(wait_until(|| provider.navigations() == 1).await);
    assert_eq!(service.admission().in_flight(), 1);

    task.abort();

    assert!(wait_until(|| provider.released() == 1).await);
    assert_eq!(service.admission().in_flight(), 0);
}

#[tokio::test]
async fn unknown_courier_uses_generic_strategy() {
    let provider = ScriptedProvider::new(Behaviour::Rows(sample_rows()));
    let service = build_service(provider.clone(), Options::default());

    let outcome = service.track(&request("123", "RPX")).await.unwrap();

    assert_eq!(outcome.events.len(), 2);
    assert!(provider.clicks().contains(&"a[onclick*=\"'rpx'\"]".to_string()));
}

#[tokio::test]
async fn malformed_courier_is_rejected_without_a_session() {
    let provider = ScriptedProvider::new(Behaviour::Rows(sample_rows()));
    let service = build_service(
        provider.clone(),
        Options {
            threshold: 1,
            ..Options::default()
        },
    );

    for courier in ["x\"]", "jne' or '1", "a b"] {
        let err = service.track(&request("123", courier)).await.unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    assert_eq!(provider.acquired(), 0);
    assert_eq!(service.breaker().failure_count(), 0);
    assert!(service.health().is_healthy());
}

#[tokio::test]
async fn session_acquire_failure_counts_against_breaker() {
    let provider = ScriptedProvider::new(Behaviour::FailAcquire);
    let service = build_service(provider.clone(), Options::default());

    let err = service.track(&request("123", "jne")).await.unwrap_err();

    assert_eq!(err.kind(), "session_error");
    assert_eq!(service.breaker().failure_count(), 1);
    assert_eq!(provider.released(), 0);
    assert_eq!(service.admission().in_flight(), 0);
}

#[tokio::test]
async fn breaker_closes_after_cooldown() {
    let provider = ScriptedProvider::new(Behaviour::FailNavigation);
    let service = build_service(
        provider.clone(),
        Options {
            threshold: 1,
            cooldown: Duration::from_millis(100),
            ..Options::default()
        },
    );

    assert!(service.track(&request("123", "jne")).await.is_err());
    assert!(matches!(
        service.track(&request("123", "jne")).await,
        Err(TrackingError::CircuitOpen { .. })
    ));
    assert!(!service.health().is_healthy());

    tokio::time::sleep(Duration::from_millis(150)).await;
    provider.set_behaviour(Behaviour::Rows(sample_rows()));

    assert!(service.track(&request("123", "jne")).await.is_ok());
    assert_eq!(service.breaker().snapshot().state, BreakerState::Closed);
    assert!(service.health().is_healthy());
}

#[tokio::test]
async fn cache_hit_is_served_while_source_is_failing() {
    let provider = ScriptedProvider::new(Behaviour::Rows(sample_rows()));
    let service = build_service(provider.clone(), Options::default());
    service.track(&request("123", "jne")).await.unwrap();

    provider.set_behaviour(Behaviour::FailNavigation);
    let outcome = service.track(&request("123", "JNE")).await.unwrap();

    assert!(outcome.cached);
    assert_eq!(provider.navigations(), 1);
}
