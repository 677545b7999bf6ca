//! Tests for the lock manager.

use super::*;
use crate::config::{LockConfiguration, UniqueArgs};
use crate::error::UniqueJobsError;
use crate::store::MemoryStore;
use crate::test_support::{
    FailingStore, capture_logs, config_with, item, just_a_worker, manager_for, manager_over,
    manager_with, ms,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn test_new_rejects_invalid_config() {
    let config = Config {
        namespace: "bad:ns".to_string(),
        ..Config::default()
    };
    let err = LockManager::new(Arc::new(MemoryStore::new()), config)
        .err()
        .unwrap();
    assert!(matches!(err, UniqueJobsError::ConfigError(_)));
}

#[test]
fn test_just_a_worker_until_executed() {
    let (manager, store) = manager_for("JustAWorker", LockType::UntilExecuted);

    let mut first = just_a_worker();
    assert_eq!(
        manager.with_lock(&mut first, Phase::Enqueue).unwrap(),
        LockOutcome::Acquired
    );

    let digest = first.unique_digest.clone().unwrap();
    let mut expected = vec![
        format!("uniquejobs:{}:EXISTS", digest),
        format!("uniquejobs:{}:GRABBED", digest),
        format!("uniquejobs:{}:VERSION", digest),
    ];
    expected.sort();
    assert_eq!(store.keys(), expected);

    let mut second = just_a_worker();
    assert_eq!(
        manager.with_lock(&mut second, Phase::Enqueue).unwrap(),
        LockOutcome::Duplicate
    );
    assert_eq!(second.unique_digest, first.unique_digest);

    let ran = manager.execute(&mut first, |job| job.jid.clone()).unwrap();
    assert_eq!(ran, Execution::Completed(first.jid.clone()));
    assert!(store.keys().is_empty());

    let mut third = just_a_worker();
    assert_eq!(
        manager.with_lock(&mut third, Phase::Enqueue).unwrap(),
        LockOutcome::Acquired
    );
}

#[test]
fn test_does_not_unlock_keys_it_does_not_own() {
    let (manager, store) = manager_for("JustAWorker", LockType::UntilExecuted);

    let mut job = just_a_worker();
    manager.with_lock(&mut job, Phase::Enqueue).unwrap();
    let keys = manager.lock_for(&mut job).unwrap().keys().unwrap().clone();

    store.set_raw(&keys.exists, "NOT_DELETED");

    let (ran, logs) = capture_logs(|| manager.execute(&mut job, |_| ()).unwrap());
    assert_eq!(ran, Execution::Completed(()));
    assert_eq!(store.get_raw(&keys.exists).as_deref(), Some("NOT_DELETED"));
    assert!(store.get_raw(&keys.grabbed).is_some());

    let message = format!("the unique_key: {} needs to be unlocked manually", keys.digest);
    assert!(logs.contains("ERROR"), "no error logged: {}", logs);
    assert!(logs.contains(&message), "missing diagnostic: {}", logs);
}

#[test]
fn test_unavailable_store_never_locks_or_runs() {
    let store = Arc::new(FailingStore::down());
    let calls = AtomicUsize::new(0);

    for lock_type in [LockType::UntilExecuted, LockType::WhileExecuting] {
        let manager = manager_over(Arc::clone(&store), "JustAWorker", lock_type);
        let mut job = just_a_worker();

        let err = manager.with_lock(&mut job, Phase::Enqueue);
        if lock_type.locks_on_enqueue() {
            assert!(matches!(err, Err(UniqueJobsError::StoreUnavailable(_))));
        }

        let err = manager
            .execute(&mut job, |_| calls.fetch_add(1, Ordering::SeqCst))
            .unwrap_err();
        assert!(matches!(err, UniqueJobsError::StoreUnavailable(_)));
    }

    // until_executed runs the body, then fails to release.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_execute_reports_failed_release() {
    let store = Arc::new(FailingStore::up());
    let manager = manager_over(Arc::clone(&store), "JustAWorker", LockType::UntilExecuted);
    let mut job = just_a_worker();
    assert_eq!(
        manager.with_lock(&mut job, Phase::Enqueue).unwrap(),
        LockOutcome::Acquired
    );

    let err = manager
        .execute(&mut job, |_| store.set_down(true))
        .unwrap_err();
    assert!(matches!(err, UniqueJobsError::StoreUnavailable(_)));
    assert_eq!(store.inner.keys().len(), 3);
}

#[test]
fn test_execute_skips_duplicate_runtime_lock() {
    let (manager, _store) = manager_for("JustAWorker", LockType::WhileExecuting);
    let calls = AtomicUsize::new(0);

    let mut outer = just_a_worker();
    let result = manager
        .execute(&mut outer, |_| {
            let mut inner = just_a_worker();
            let nested = manager
                .execute(&mut inner, |_| calls.fetch_add(1, Ordering::SeqCst))
                .unwrap();
            calls.fetch_add(1, Ordering::SeqCst);
            nested
        })
        .unwrap();

    assert_eq!(result, Execution::Completed(Execution::Skipped));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_execute_releases_when_body_fails() {
    let (manager, store) = manager_for("JustAWorker", LockType::UntilExecuted);
    let mut job = just_a_worker();
    manager.with_lock(&mut job, Phase::Enqueue).unwrap();

    let ran = manager
        .execute(&mut job, |_| -> std::result::Result<(), String> {
            Err("boom".to_string())
        })
        .unwrap();

    assert_eq!(ran, Execution::Completed(Err("boom".to_string())));
    assert!(store.keys().is_empty());
}

#[test]
fn test_execute_releases_when_body_panics() {
    let (manager, store) = manager_for("JustAWorker", LockType::UntilExecuted);
    let mut job = just_a_worker();
    manager.with_lock(&mut job, Phase::Enqueue).unwrap();
    assert!(!store.keys().is_empty());

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        manager.execute(&mut job, |_| -> () { panic!("job crashed") })
    }));

    assert!(result.is_err());
    assert!(store.keys().is_empty());
}

#[test]
fn test_until_executing_unlocks_before_body() {
    let (manager, store) = manager_for("JustAWorker", LockType::UntilExecuting);
    let mut job = just_a_worker();
    manager.with_lock(&mut job, Phase::Enqueue).unwrap();

    let seen = manager.execute(&mut job, |_| store.keys()).unwrap();
    assert_eq!(seen, Execution::Completed(Vec::new()));
}

#[test]
fn test_until_and_while_executing_allows_requeue_during_body() {
    let (manager, store) = manager_for("JustAWorker", LockType::UntilAndWhileExecuting);
    let mut job = just_a_worker();
    manager.with_lock(&mut job, Phase::Enqueue).unwrap();

    let requeued = manager
        .execute(&mut job, |_| {
            let mut again = just_a_worker();
            manager.with_lock(&mut again, Phase::Enqueue).unwrap()
        })
        .unwrap();
    assert_eq!(requeued, Execution::Completed(LockOutcome::Acquired));

    // The requeued job's enqueue lock outlives the first run.
    assert_eq!(store.keys().len(), 3);
    assert!(store.keys().iter().all(|k| !k.contains(":RUN:")));
}

#[test]
fn test_until_timeout_keeps_lock_after_execution() {
    let config = config_with(
        "JustAWorker",
        LockConfiguration::new(LockType::UntilTimeout).with_ttl(ms(60_000)),
    );
    let (manager, store) = manager_with(config);
    let mut job = just_a_worker();
    manager.with_lock(&mut job, Phase::Enqueue).unwrap();

    manager.execute(&mut job, |_| ()).unwrap();
    assert_eq!(store.keys().len(), 3);
    assert_eq!(
        manager.with_lock(&mut just_a_worker(), Phase::Enqueue).unwrap(),
        LockOutcome::Duplicate
    );
}

#[test]
fn test_undeclared_class_is_not_locked() {
    let (manager, store) = manager_for("JustAWorker", LockType::UntilExecuted);

    let mut job = item("OtherWorker", vec![json!(1)]);
    assert_eq!(
        manager.with_lock(&mut job, Phase::Enqueue).unwrap(),
        LockOutcome::Untouched
    );
    assert!(job.unique_digest.is_none());
    assert_eq!(manager.execute(&mut job, |_| 7).unwrap(), Execution::Completed(7));
    assert!(store.keys().is_empty());
}

#[test]
fn test_unique_args_subset_collapses_jobs() {
    let lock = LockConfiguration::new(LockType::UntilExecuted).with_unique_args(UniqueArgs {
        arg_indices: Some(vec![0]),
        ..UniqueArgs::default()
    });
    let (manager, _store) = manager_with(config_with("ReportWorker", lock));

    let mut first = item("ReportWorker", vec![json!(42), json!("2024-01-01")]);
    let mut second = item("ReportWorker", vec![json!(42), json!("2024-01-02")]);
    let mut other = item("ReportWorker", vec![json!(43), json!("2024-01-01")]);

    assert_eq!(
        manager.with_lock(&mut first, Phase::Enqueue).unwrap(),
        LockOutcome::Acquired
    );
    assert_eq!(
        manager.with_lock(&mut second, Phase::Enqueue).unwrap(),
        LockOutcome::Duplicate
    );
    assert_eq!(
        manager.with_lock(&mut other, Phase::Enqueue).unwrap(),
        LockOutcome::Acquired
    );
}

#[test]
fn test_force_clear_and_owner() {
    let (manager, store) = manager_for("JustAWorker", LockType::UntilExecuted);
    let mut job = just_a_worker();
    manager.with_lock(&mut job, Phase::Enqueue).unwrap();

    let digest = Digest::parse(job.unique_digest.as_deref().unwrap()).unwrap();
    let keys = manager.key_set(&digest, LockType::UntilExecuted);

    let owner = manager.owner(&keys).unwrap().unwrap();
    assert_eq!(owner.jid, job.jid);
    assert_eq!(owner.class, "JustAWorker");

    assert!(manager.force_clear(&keys).unwrap());
    assert!(!manager.force_clear(&keys).unwrap());
    assert!(store.keys().is_empty());
}
