//! Digest engine for uniquejobs.
//!
//! A digest is the identity shared by independently submitted copies of the
//! same job. It is the SHA-256 of a canonical JSON encoding of the fields
//! selected by [`UniqueArgs`].
//!
//! # Canonical Encoding
//!
//! - The projection is a JSON object with keys from `class`, `queue`, `args`
//!   and `at`, depending on the selector
//! - Object keys are sorted at every depth, so argument maps that differ only
//!   in insertion order encode identically
//! - Array (argument) order is preserved
//! - Floats with no fractional part are written as integers (`1.0` → `1`);
//!   other floats use the shortest round-trip form
//! - `at` is written as integer Unix seconds
//!
//! The encoding never depends on process state, so the enqueuing process and
//! the worker compute the same digest.

use crate::config::UniqueArgs;
use crate::error::{Result, UniqueJobsError};
use crate::job::JobItem;
use serde_json::{Map, Value};
use sha2::{Digest as _, Sha256};
use std::fmt::Write as _;


/// Largest integer a double represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Fixed-length fingerprint of a job's identity fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest(String);

impl Digest {
    /// Length of a digest in hex characters.
    pub const LEN: usize = 64;

    /// Parse a digest, rejecting anything that is not 64 lowercase hex chars.
    pub fn parse(s: &str) -> Result<Self> {
        let well_formed = s.len() == Self::LEN
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));

        if !well_formed {
            return Err(UniqueJobsError::DigestMismatch(format!(
                "'{}' is not a {}-character lowercase hex digest",
                s,
                Self::LEN
            )));
        }

        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the digest of `item` under `selector`.
pub fn digest(item: &JobItem, selector: &UniqueArgs) -> Digest {
    let payload = canonical_payload(item, selector);
    let hash = Sha256::digest(payload.as_bytes());
    Digest(format!("{:x}", hash))
}

/// Return the digest stored on `item`, computing and storing it first if absent.
///
/// A stored digest is reused as is; it is never recomputed, even if the
/// selector would now produce something else.
///
/// # Returns
///
/// * `Ok(Digest)` - The item's digest
/// * `Err(UniqueJobsError::DigestMismatch)` - The stored digest is malformed
pub fn ensure_digest(item: &mut JobItem, selector: &UniqueArgs) -> Result<Digest> {
    if let Some(stored) = &item.unique_digest {
        return Digest::parse(stored);
    }

    let computed = digest(item, selector);
    item.unique_digest = Some(computed.as_str().to_string());
    Ok(computed)
}

/// Build the canonical encoding of the fields of `item` named by `selector`.
pub fn canonical_payload(item: &JobItem, selector: &UniqueArgs) -> String {
    let mut projection = Map::new();
    projection.insert("class".to_string(), Value::String(item.class.clone()));

    if selector.include_queue {
        projection.insert("queue".to_string(), Value::String(item.queue.clone()));
    }

    if selector.include_args {
        let args = match &selector.arg_indices {
            Some(indices) => indices
                .iter()
                .map(|&i| item.args.get(i).cloned().unwrap_or(Value::Null))
                .collect(),
            None => item.args.clone(),
        };
        projection.insert("args".to_string(), Value::Array(args));
    }

    if selector.include_at {
        let at = item
            .at
            .map(|at| Value::from(at.timestamp()))
            .unwrap_or(Value::Null);
        projection.insert("at".to_string(), at);
    }

    let mut out = String::new();
    write_canonical(&Value::Object(projection), &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                let _ = write!(out, "{}", i);
            } else if let Some(u) = n.as_u64() {
                let _ = write!(out, "{}", u);
            } else if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f.abs() < MAX_SAFE_INTEGER {
                    let _ = write!(out, "{}", f as i64);
                } else {
                    out.push_str(&n.to_string());
                }
            }
        }
        Value::String(s) => {
            // Serializing a str cannot fail.
            out.push_str(&serde_json::to_string(s).unwrap_or_default());
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key).unwrap_or_default());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
    }
}
