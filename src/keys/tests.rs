//! Tests for the key namespace and lock metadata.

use super::*;
use crate::config::UniqueArgs;
use crate::digest::digest;
use crate::job::JobItem;
use chrono::{Duration, Utc};
use serde_json::json;

fn sample_digest() -> Digest {
    let item = JobItem::new("JustAWorker", "testqueue", vec![json!({"foo": "bar"})]);
    digest(&item, &UniqueArgs::default())
}

#[test]
fn test_enqueue_scoped_keys() {
    let d = sample_digest();
    let keys = LockKeySet::for_digest("uniquejobs", &d, LockType::UntilExecuted);

    assert_eq!(keys.scope, KeyScope::Enqueue);
    assert_eq!(keys.exists, format!("uniquejobs:{}:EXISTS", d));
    assert_eq!(keys.grabbed, format!("uniquejobs:{}:GRABBED", d));
    assert_eq!(keys.version, format!("uniquejobs:{}:VERSION", d));
    assert_eq!(keys.to_string(), format!("uniquejobs:{}", d));
}

#[test]
fn test_while_executing_uses_runtime_keys() {
    let d = sample_digest();
    let keys = LockKeySet::for_digest("uniquejobs", &d, LockType::WhileExecuting);

    assert_eq!(keys.scope, KeyScope::Runtime);
    assert_eq!(keys.exists, format!("uniquejobs:{}:RUN:EXISTS", d));
    assert_eq!(
        keys,
        LockKeySet::with_scope("uniquejobs", &d, KeyScope::Runtime)
    );
}

#[test]
fn test_scopes_never_share_keys() {
    let d = sample_digest();
    let enqueue = LockKeySet::with_scope("ns", &d, KeyScope::Enqueue);
    let runtime = LockKeySet::with_scope("ns", &d, KeyScope::Runtime);

    for key in enqueue.all() {
        assert!(!runtime.all().contains(&key));
    }
}

#[test]
fn test_key_derivation_is_pure() {
    let d = sample_digest();
    assert_eq!(
        LockKeySet::for_digest("ns", &d, LockType::UntilTimeout),
        LockKeySet::for_digest("ns", &d, LockType::UntilTimeout)
    );
}

#[test]
fn test_lock_metadata_creation() {
    let item = JobItem::new("JustAWorker", "testqueue", vec![]);
    let meta = LockMetadata::new(&item.jid, &item, LockType::UntilExecuted, None).unwrap();

    assert_eq!(meta.token, item.jid);
    assert_eq!(meta.class, "JustAWorker");
    assert!(!meta.owner.is_empty());
    assert!(meta.pid.is_some());
    assert!(meta.expires_at.is_none());
    assert!(meta.remaining_ttl().is_none());
    assert!(meta.age().num_minutes() < 1);
}

#[test]
fn test_lock_metadata_encoding() {
    let item = JobItem::new("JustAWorker", "testqueue", vec![]);
    let meta = LockMetadata::new(
        "token-1",
        &item,
        LockType::UntilTimeout,
        Some(std::time::Duration::from_secs(600)),
    )
    .unwrap();

    let raw = meta.encode().unwrap();
    assert!(raw.contains("\"token\":\"token-1\""));
    assert!(raw.contains("until_timeout"));

    let decoded = LockMetadata::decode(&raw).unwrap();
    assert_eq!(decoded, meta);

    let remaining = decoded.remaining_ttl().unwrap();
    assert!(remaining > Duration::seconds(590));
    assert!(remaining <= Duration::seconds(600));
}

#[test]
fn test_decode_rejects_foreign_values() {
    let err = LockMetadata::decode("NOT_DELETED").unwrap_err();
    assert!(matches!(
        err,
        crate::error::UniqueJobsError::Serialization(_)
    ));
}

#[test]
fn test_lock_metadata_age_string() {
    let item = JobItem::new("A", "q", vec![]);
    let mut meta = LockMetadata::new("t", &item, LockType::UntilExecuted, None).unwrap();

    assert!(meta.age_string().ends_with('s'));

    meta.created_at = Utc::now() - Duration::hours(2);
    assert!(meta.age_string().contains('h'));

    meta.created_at = Utc::now() - Duration::days(3);
    assert!(meta.age_string().contains('d'));
}

#[test]
fn test_expired_metadata_has_zero_remaining_ttl() {
    let item = JobItem::new("A", "q", vec![]);
    let mut meta = LockMetadata::new(
        "t",
        &item,
        LockType::UntilExecuted,
        Some(std::time::Duration::from_secs(1)),
    )
    .unwrap();
    meta.expires_at = Some(Utc::now() - Duration::seconds(5));
    assert_eq!(meta.remaining_ttl(), Some(Duration::zero()));
}

#[test]
fn test_lock_metadata_rejects_unrepresentable_expiry() {
    let item = JobItem::new("A", "q", vec![]);
    for ttl in [
        std::time::Duration::from_secs(10_000_000_000_000),
        std::time::Duration::MAX,
    ] {
        let err = LockMetadata::new("t", &item, LockType::UntilExecuted, Some(ttl)).unwrap_err();
        assert!(matches!(err, crate::error::UniqueJobsError::ConfigError(_)));
    }
}
