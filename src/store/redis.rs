//! Redis lock store.
//!
//! The conditional operations (acquire, release-if-owner, extend-if-owner) are
//! Lua scripts so each is a single atomic step on the server. Plain reads and
//! forced deletes use ordinary commands; forced deletes of many locks are
//! pipelined.

use super::pool::ConnectionPool;
use super::{LockStore, ReleaseOutcome};
use crate::config::Config;
use crate::error::{Result, UniqueJobsError};
use crate::keys::{LOCK_VERSION, LockKeySet, LockMetadata};
use redis::{Commands, Script};
use std::time::Duration;

const ACQUIRE_LUA: &str = include_str!("lua/acquire.lua");
const RELEASE_LUA: &str = include_str!("lua/release.lua");
const EXTEND_LUA: &str = include_str!("lua/extend.lua");

/// Strip credentials from a Redis URL for log and error messages.
fn summarize_redis_url(url: &str) -> String {
    let (scheme, rest) = url.split_once("://").unwrap_or(("", url));
    let without_auth = rest.rsplit('@').next().unwrap_or(rest);

    if scheme.is_empty() {
        without_auth.to_string()
    } else {
        format!("{}://{}", scheme, without_auth)
    }
}

/// A TTL in milliseconds for PX/PEXPIRE.
///
/// A zero TTL would delete the key, so it is rounded up to 1ms. TTLs beyond
/// what Redis accepts are an error, never truncated.
fn ttl_millis(ttl: Duration) -> Result<i64> {
    i64::try_from(ttl.as_millis())
        .map(|ms| ms.max(1))
        .map_err(|_| {
            UniqueJobsError::ConfigError(format!("lock ttl {:?} is out of range for Redis", ttl))
        })
}

/// Applies the per-command read/write timeout to each new connection.
#[derive(Debug)]
struct CommandTimeouts(Duration);

impl r2d2::CustomizeConnection<redis::Connection, redis::RedisError> for CommandTimeouts {
    fn on_acquire(&self, conn: &mut redis::Connection) -> redis::RedisResult<()> {
        conn.set_read_timeout(Some(self.0))?;
        conn.set_write_timeout(Some(self.0))
    }
}

/// Redis-backed lock store.
pub struct RedisStore {
    pool: ConnectionPool<redis::Client>,
    acquire_script: Script,
    release_script: Script,
    extend_script: Script,
}

impl RedisStore {
    /// Create a store for `config.redis_url`.
    ///
    /// No connection is opened until the first operation.
    ///
    /// # Returns
    ///
    /// * `Ok(RedisStore)` - Store ready to use
    /// * `Err(UniqueJobsError::ConfigError)` - The URL is not a valid Redis URL
    pub fn new(config: &Config) -> Result<Self> {
        let client = redis::Client::open(config.redis_url.as_str()).map_err(|e| {
            UniqueJobsError::ConfigError(format!(
                "invalid redis_url '{}': {}",
                summarize_redis_url(&config.redis_url),
                e
            ))
        })?;

        tracing::debug!(
            redis = %summarize_redis_url(&config.redis_url),
            pool_size = config.pool_size,
            "created store pool"
        );
        let pool = ConnectionPool::with_customizer(
            client,
            config.pool_size,
            config.checkout_timeout(),
            Box::new(CommandTimeouts(config.command_timeout())),
        );

        Ok(Self {
            pool,
            acquire_script: Script::new(ACQUIRE_LUA),
            release_script: Script::new(RELEASE_LUA),
            extend_script: Script::new(EXTEND_LUA),
        })
    }

    /// Round-trip a PING to check the store is reachable.
    pub fn ping(&self) -> Result<()> {
        self.pool.with_connection(|conn| {
            let _: String = redis::cmd("PING").query(conn)?;
            Ok(())
        })
    }

    /// The pool behind this store.
    pub fn pool(&self) -> &ConnectionPool<redis::Client> {
        &self.pool
    }
}

impl LockStore for RedisStore {
    fn try_acquire(
        &self,
        keys: &LockKeySet,
        metadata: &LockMetadata,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        let payload = metadata.encode()?;
        let ttl_ms = ttl.map(ttl_millis).transpose()?.unwrap_or(0);

        self.pool.with_connection(|conn| {
            let acquired: i64 = self
                .acquire_script
                .key(&keys.exists)
                .key(&keys.grabbed)
                .key(&keys.version)
                .arg(&metadata.token)
                .arg(&payload)
                .arg(ttl_ms)
                .arg(LOCK_VERSION)
                .invoke(conn)?;
            Ok(acquired == 1)
        })
    }

    fn release(&self, keys: &LockKeySet, token: &str) -> Result<ReleaseOutcome> {
        self.pool.with_connection(|conn| {
            let outcome: i64 = self
                .release_script
                .key(&keys.exists)
                .key(&keys.grabbed)
                .key(&keys.version)
                .arg(token)
                .invoke(conn)?;

            Ok(match outcome {
                1 => ReleaseOutcome::Released,
                0 => ReleaseOutcome::Absent,
                _ => ReleaseOutcome::NotOwned,
            })
        })
    }

    fn extend(&self, keys: &LockKeySet, token: &str, ttl: Duration) -> Result<bool> {
        let ttl_ms = ttl_millis(ttl)?;
        self.pool.with_connection(|conn| {
            let extended: i64 = self
                .extend_script
                .key(&keys.exists)
                .key(&keys.grabbed)
                .key(&keys.version)
                .arg(token)
                .arg(ttl_ms)
                .invoke(conn)?;
            Ok(extended == 1)
        })
    }

    fn exists(&self, keys: &LockKeySet) -> Result<bool> {
        self.pool.with_connection(|conn| {
            let exists: bool = conn.exists(&keys.exists)?;
            Ok(exists)
        })
    }

    fn owner(&self, keys: &LockKeySet) -> Result<Option<LockMetadata>> {
        let raw = self.pool.with_connection(|conn| {
            let raw: Option<String> = conn.get(&keys.grabbed)?;
            Ok(raw)
        })?;

        raw.as_deref().map(LockMetadata::decode).transpose()
    }

    fn clear_all(&self, keys: &LockKeySet) -> Result<bool> {
        self.pool.with_connection(|conn| {
            let deleted: i64 = conn.del(&keys.all()[..])?;
            Ok(deleted > 0)
        })
    }

    fn clear_many(&self, keys: &[LockKeySet]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut pipe = redis::pipe();
        for key_set in keys {
            pipe.cmd("DEL")
                .arg(&key_set.exists)
                .arg(&key_set.grabbed)
                .arg(&key_set.version);
        }

        self.pool.with_connection(|conn| {
            let deleted: Vec<i64> = pipe.query(conn)?;
            Ok(deleted.into_iter().filter(|&n| n > 0).count())
        })
    }
}
