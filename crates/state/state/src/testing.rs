use std::time::Duration;

use chrono::Utc;

use tollgate_core::{CallerId, Granularity, QuotaKey, WindowKey};

use crate::error::StateError;
use crate::store::CounterStore;

fn window_key(id: &str) -> WindowKey {
    WindowKey::new(CallerId::User(id.to_owned()), Granularity::Minute)
}

fn quota_key(id: &str, feature: &str) -> QuotaKey {
    QuotaKey::new(&CallerId::User(id.to_owned()), feature, Utc::now())
}

const WINDOW: Duration = Duration::from_secs(60);
const TTL: Duration = Duration::from_secs(86_400);

/// Run the full counter-store conformance test suite.
///
/// Call this from your backend's test module with a fresh store instance
/// (or, for shared backends, a unique key prefix per run).
///
/// # Errors
///
/// Returns an error if any conformance test fails.
pub async fn run_counter_conformance_tests(store: &dyn CounterStore) -> Result<(), StateError> {
    test_admits_up_to_limit(store).await?;
    test_denies_over_limit(store).await?;
    test_denied_attempts_are_counted(store).await?;
    test_keys_are_independent(store).await?;
    test_quota_increment_accumulates(store).await?;
    test_quota_keys_are_independent(store).await?;
    test_probe(store).await?;
    Ok(())
}

async fn test_admits_up_to_limit(store: &dyn CounterStore) -> Result<(), StateError> {
    let key = window_key("conf-admit");
    for i in 0..5u32 {
        let decision = store.check_and_record(&key, 5, WINDOW).await?;
        assert!(decision.allowed, "event {i} within the limit should admit");
        assert_eq!(decision.count_before, u64::from(i));
        assert_eq!(decision.remaining, 4 - i);
    }
    Ok(())
}

async fn test_denies_over_limit(store: &dyn CounterStore) -> Result<(), StateError> {
    let key = window_key("conf-deny");
    for _ in 0..3 {
        store.check_and_record(&key, 3, WINDOW).await?;
    }
    let decision = store.check_and_record(&key, 3, WINDOW).await?;
    assert!(!decision.allowed, "event past the limit should deny");
    assert_eq!(decision.remaining, 0, "remaining should be zero on denial");
    Ok(())
}

async fn test_denied_attempts_are_counted(store: &dyn CounterStore) -> Result<(), StateError> {
    let key = window_key("conf-attempts");
    for _ in 0..2 {
        store.check_and_record(&key, 2, WINDOW).await?;
    }
    // The denied attempt must itself be recorded, so the observed count
    // keeps growing on subsequent denials.
    let first_denial = store.check_and_record(&key, 2, WINDOW).await?;
    let second_denial = store.check_and_record(&key, 2, WINDOW).await?;
    assert!(!first_denial.allowed);
    assert!(!second_denial.allowed);
    assert_eq!(first_denial.count_before, 2);
    assert_eq!(second_denial.count_before, 3);
    Ok(())
}

async fn test_keys_are_independent(store: &dyn CounterStore) -> Result<(), StateError> {
    let busy = window_key("conf-busy");
    let quiet = window_key("conf-quiet");
    for _ in 0..3 {
        store.check_and_record(&busy, 2, WINDOW).await?;
    }
    let decision = store.check_and_record(&quiet, 2, WINDOW).await?;
    assert!(
        decision.allowed,
        "a different caller's key must not be affected"
    );
    assert_eq!(decision.count_before, 0);
    Ok(())
}

async fn test_quota_increment_accumulates(store: &dyn CounterStore) -> Result<(), StateError> {
    let key = quota_key("conf-quota", "summarize");
    assert_eq!(store.increment_day(&key, TTL).await?, 1);
    assert_eq!(store.increment_day(&key, TTL).await?, 2);
    assert_eq!(store.increment_day(&key, TTL).await?, 3);
    Ok(())
}

async fn test_quota_keys_are_independent(store: &dyn CounterStore) -> Result<(), StateError> {
    let summarize = quota_key("conf-quota-iso", "summarize");
    let translate = quota_key("conf-quota-iso", "translate");
    store.increment_day(&summarize, TTL).await?;
    store.increment_day(&summarize, TTL).await?;
    assert_eq!(
        store.increment_day(&translate, TTL).await?,
        1,
        "features must count separately"
    );
    Ok(())
}

async fn test_probe(store: &dyn CounterStore) -> Result<(), StateError> {
    store.probe().await
}
