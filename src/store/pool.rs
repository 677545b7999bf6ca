//! Bounded connection pool over `r2d2`.
//!
//! Connections are opened lazily up to `max_size`; nothing is opened when the
//! pool is built. A checkout waits at most `checkout_timeout`, then fails with
//! `StoreUnavailable`. r2d2 hands connections back on drop, validates them on
//! checkout and closes the ones that report broken.

use crate::error::{Result, UniqueJobsError};
use r2d2::{CustomizeConnection, HandleError, ManageConnection};
use std::time::Duration;

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub open: usize,
    pub idle: usize,
    pub max_size: usize,
}

/// Routes r2d2's background connection errors to `tracing`.
#[derive(Debug)]
struct TracingErrorHandler;

impl<E: std::fmt::Display> HandleError<E> for TracingErrorHandler {
    fn handle_error(&self, error: E) {
        tracing::warn!(error = %error, "store connection error");
    }
}

/// A bounded pool of store connections.
pub struct ConnectionPool<M: ManageConnection> {
    inner: r2d2::Pool<M>,
}

impl<M: ManageConnection> ConnectionPool<M> {
    /// Create a pool that opens connections through `manager`.
    pub fn new(manager: M, max_size: usize, checkout_timeout: Duration) -> Self {
        Self::from_builder(manager, Self::builder(max_size, checkout_timeout))
    }

    /// Like [`Self::new`], running `customizer` on every new connection.
    pub fn with_customizer(
        manager: M,
        max_size: usize,
        checkout_timeout: Duration,
        customizer: Box<dyn CustomizeConnection<M::Connection, M::Error>>,
    ) -> Self {
        let builder = Self::builder(max_size, checkout_timeout).connection_customizer(customizer);
        Self::from_builder(manager, builder)
    }

    fn builder(max_size: usize, checkout_timeout: Duration) -> r2d2::Builder<M> {
        let max_size = u32::try_from(max_size).unwrap_or(u32::MAX).max(1);
        r2d2::Pool::builder()
            .max_size(max_size)
            .min_idle(Some(0))
            .connection_timeout(checkout_timeout.max(Duration::from_millis(1)))
            .error_handler(Box::new(TracingErrorHandler))
    }

    fn from_builder(manager: M, builder: r2d2::Builder<M>) -> Self {
        // min_idle is zero, so no connection is attempted here.
        Self {
            inner: builder.build_unchecked(manager),
        }
    }

    /// Current occupancy.
    pub fn status(&self) -> PoolStatus {
        let state = self.inner.state();
        PoolStatus {
            open: state.connections as usize,
            idle: state.idle_connections as usize,
            max_size: self.inner.max_size() as usize,
        }
    }

    /// Run `f` on a checked-out connection.
    ///
    /// # Returns
    ///
    /// * `Ok(T)` - What `f` returned
    /// * `Err(UniqueJobsError::StoreUnavailable)` - No connection could be
    ///   checked out within the timeout, or `f` failed at the store
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut M::Connection) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self.inner.get().map_err(|e| {
            UniqueJobsError::StoreUnavailable(format!(
                "no store connection within {:?}: {}",
                self.inner.connection_timeout(),
                e
            ))
        })?;
        f(&mut *conn)
    }
}
