// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Connection pool for RouterOS API workers
//!
//! A pool owns up to `pool_size` authenticated connections. Checkout hands
//! each worker to at most one caller at a time; waiters queue FIFO on a
//! fair semaphore. Workers are created lazily, and a worker that died in a
//! caller's hands is discarded at checkin and replaced on the next demand.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Instant, SystemTime};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::ClientConfig;
use crate::connection::parse::AttributeMap;
use crate::connection::Connection;
use crate::error::{ApiError, Result};
use crate::telemetry::{NoopTelemetry, TelemetryEvent, TelemetryHook};

/// Pool of RouterOS connections to a single router
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    config: ClientConfig,
    name: String,
    limiter: Arc<Semaphore>,
    idle: Mutex<Vec<Connection>>,
    closed: AtomicBool,
    telemetry: Arc<dyn TelemetryHook>,
}

impl PoolInner {
    fn push_idle(&self, conn: Connection) {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(conn);
    }

    fn pop_idle(&self) -> Option<Connection> {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
    }
}

/// Idle/capacity snapshot for metrics
#[derive(Debug, Clone, Copy)]
pub struct PoolStatus {
    pub idle: usize,
    pub capacity: usize,
}

/// RAII guard for a checked-out worker
///
/// Returns the worker to the pool when dropped, on every exit path
/// including panics. A worker that is no longer alive is discarded
/// instead; its slot is refilled lazily by a later checkout.
pub struct PoolGuard {
    conn: Option<Connection>,
    pool: Arc<PoolInner>,
    command: Option<String>,
    checked_out_at: Instant,
    _permit: OwnedSemaphorePermit,
}

impl PoolGuard {
    /// Get a mutable reference to the underlying connection
    pub fn connection_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection already returned")
    }
}

impl std::fmt::Debug for PoolGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolGuard")
            .field("checked_out_at", &self.checked_out_at)
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

impl std::ops::Deref for PoolGuard {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection already returned")
    }
}

impl std::ops::DerefMut for PoolGuard {
    fn deref_mut(&mut self) -> &mut Connection {
        self.connection_mut()
    }
}

impl Drop for PoolGuard {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.telemetry.emit(TelemetryEvent::PoolCheckin {
                pool: self.pool.name.clone(),
                command: self.command.take(),
                duration: self.checked_out_at.elapsed(),
            });
            if conn.is_alive() && !self.pool.closed.load(Ordering::SeqCst) {
                tracing::trace!("Connection returned to pool {}", self.pool.name);
                self.pool.push_idle(conn);
            } else {
                tracing::trace!("Discarding dead connection to {}", self.pool.name);
            }
        }
        // The permit is released with the guard, waking the head waiter.
    }
}

impl Pool {
    /// Creates a pool for the config, sized by `config.pool_size`.
    ///
    /// Workers are dialled lazily, so a router that is down surfaces its
    /// connect error at the first checkout rather than here.
    pub fn start(config: ClientConfig) -> Result<Self> {
        Self::start_with_telemetry(config, Arc::new(NoopTelemetry))
    }

    /// Same as [`Pool::start`] with an injected telemetry observer.
    pub fn start_with_telemetry(
        config: ClientConfig,
        telemetry: Arc<dyn TelemetryHook>,
    ) -> Result<Self> {
        config.validate().map_err(ApiError::ConnectionFailed)?;
        let name = format!("{}:{}", config.host, config.effective_port());
        let limiter = Arc::new(Semaphore::new(config.pool_size));
        Ok(Self {
            inner: Arc::new(PoolInner {
                config,
                name,
                limiter,
                idle: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
                telemetry,
            }),
        })
    }

    /// Checks out a worker, waiting FIFO when all slots are in use.
    pub async fn checkout(&self) -> Result<PoolGuard> {
        self.checkout_for(None).await
    }

    async fn checkout_for(&self, command: Option<String>) -> Result<PoolGuard> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(ApiError::Closed);
        }
        let permit = self
            .inner
            .limiter
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ApiError::Closed)?;
        // stop() may have raced the acquire
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(ApiError::Closed);
        }

        self.inner.telemetry.emit(TelemetryEvent::PoolCheckout {
            system_time: SystemTime::now(),
            pool: self.inner.name.clone(),
            command: command.clone(),
        });

        let conn = match self.inner.pop_idle() {
            Some(conn) if conn.is_alive() => conn,
            Some(dead) => {
                drop(dead);
                self.open_worker().await?
            }
            None => self.open_worker().await?,
        };

        Ok(PoolGuard {
            conn: Some(conn),
            pool: self.inner.clone(),
            command,
            checked_out_at: Instant::now(),
            _permit: permit,
        })
    }

    async fn open_worker(&self) -> Result<Connection> {
        tracing::debug!("Creating new pooled connection to {}", self.inner.name);
        Connection::open_with_telemetry(self.inner.config.clone(), self.inner.telemetry.clone())
            .await
    }

    /// Checks out a worker, runs `f` on it exactly once, and checks it
    /// back in whatever the outcome.
    pub async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: AsyncFnOnce(&mut Connection) -> Result<T>,
    {
        let mut guard = self.checkout().await?;
        f(guard.connection_mut()).await
    }

    /// Runs one command on any available worker.
    pub async fn command<W: AsRef<str>>(&self, words: &[W]) -> Result<Vec<AttributeMap>> {
        let command = words.first().map(|w| w.as_ref().to_string());
        let mut guard = self.checkout_for(command).await?;
        guard.connection_mut().execute(words).await
    }

    /// Closes every idle worker and rejects further checkouts.
    ///
    /// Checked-out workers finish their current command; their guards
    /// observe the closed pool at checkin and discard them.
    pub async fn stop(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.limiter.close();
        let idle: Vec<Connection> = {
            let mut idle = self
                .inner
                .idle
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *idle)
        };
        for mut conn in idle {
            conn.close().await;
        }
        tracing::debug!("Pool {} stopped", self.inner.name);
    }

    #[must_use]
    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            idle: self
                .inner
                .idle
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
            capacity: self.inner.config.pool_size,
        }
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.status();
        f.debug_struct("Pool")
            .field("name", &self.inner.name)
            .field("idle", &status.idle)
            .field("capacity", &status.capacity)
            .finish_non_exhaustive()
    }
}
