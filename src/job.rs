//! Job items as seen by the locking core.
//!
//! A [`JobItem`] is the serialized job payload that travels through the
//! external queue. Only the identity fields (`class`, `queue`, `args`, `at`),
//! the job id and the computed `unique_digest` are interpreted here; every
//! other field is preserved untouched in `extra`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// A job payload carrying the fields uniqueness is computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobItem {
    /// Job type identifier (e.g., `JustAWorker`).
    pub class: String,

    /// Queue the job is pushed to.
    pub queue: String,

    /// Ordered job arguments.
    #[serde(default)]
    pub args: Vec<Value>,

    /// Scheduled execution time, as integer Unix seconds on the wire.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub at: Option<DateTime<Utc>>,

    /// Job id. Also the token proving ownership of this job's locks.
    #[serde(default = "new_jid")]
    pub jid: String,

    /// Digest computed on first lock attempt and reused afterwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_digest: Option<String>,

    /// Fields owned by the queue layer, preserved for round-tripping.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn new_jid() -> String {
    Uuid::new_v4().simple().to_string()
}

impl JobItem {
    /// Create a job item with a fresh random job id.
    pub fn new(class: impl Into<String>, queue: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            class: class.into(),
            queue: queue.into(),
            args,
            at: None,
            jid: new_jid(),
            unique_digest: None,
            extra: BTreeMap::new(),
        }
    }

    /// Schedule the job for a given time.
    pub fn with_at(mut self, at: DateTime<Utc>) -> Self {
        self.at = Some(at);
        self
    }

    /// Replace the job id.
    pub fn with_jid(mut self, jid: impl Into<String>) -> Self {
        self.jid = jid.into();
        self
    }

    /// Whether the job targets a future time rather than a queue.
    pub fn is_scheduled(&self) -> bool {
        self.at.is_some()
    }

    /// Parse a job item from its JSON payload.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the job item to its JSON payload.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn new_items_get_distinct_job_ids() {
        let a = JobItem::new("JustAWorker", "testqueue", vec![]);
        let b = JobItem::new("JustAWorker", "testqueue", vec![]);
        assert_ne!(a.jid, b.jid);
        assert_eq!(a.jid.len(), 32);
    }

    #[test]
    fn payload_round_trip_preserves_unknown_fields() {
        let json = r#"{"class":"JustAWorker","queue":"testqueue","args":[{"foo":"bar"}],
            "jid":"abc","retry":true,"created_at":1700000000}"#;
        let item = JobItem::from_json(json).unwrap();

        assert_eq!(item.jid, "abc");
        assert_eq!(item.args, vec![json!({"foo": "bar"})]);
        assert_eq!(item.extra.get("retry"), Some(&json!(true)));

        let back: Value = serde_json::from_str(&item.to_json().unwrap()).unwrap();
        assert_eq!(back["created_at"], json!(1700000000));
        assert!(back.get("unique_digest").is_none());
    }

    #[test]
    fn scheduled_time_is_integer_seconds() {
        let at = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let item = JobItem::new("JustAWorker", "testqueue", vec![]).with_at(at);
        assert!(item.is_scheduled());

        let back: Value = serde_json::from_str(&item.to_json().unwrap()).unwrap();
        assert_eq!(back["at"], json!(at.timestamp()));
    }

    #[test]
    fn missing_jid_is_generated() {
        let item = JobItem::from_json(r#"{"class":"A","queue":"q"}"#).unwrap();
        assert!(!item.jid.is_empty());
        assert!(item.args.is_empty());
    }
}
