// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Telemetry event contract
//!
//! The client emits an event at every connection, command, and pool
//! checkout boundary. Observers implement [`TelemetryHook`] and are
//! injected at construction time; the default is [`NoopTelemetry`], and
//! nothing in the core depends on an observer being attached.

use std::time::{Duration, SystemTime};

/// A lifecycle event emitted by the client core.
///
/// Start events carry the wall-clock instant the operation began as their
/// measurement; stop and exception events carry the elapsed duration,
/// measured by the emitter.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum TelemetryEvent {
    /// A connection attempt began
    ConnectionStart {
        system_time: SystemTime,
        host: String,
        port: u16,
        tls: bool,
    },
    /// A connection closed cleanly or was discarded
    ConnectionStop {
        host: String,
        port: u16,
        duration: Duration,
    },
    /// A connection attempt failed
    ConnectionException {
        host: String,
        port: u16,
        reason: String,
        duration: Duration,
    },
    /// A command was written to a connection
    CommandStart {
        system_time: SystemTime,
        /// First word of the request sentence
        command: String,
    },
    /// A command completed with a `!done` block
    CommandStop {
        command: String,
        duration: Duration,
        result_count: usize,
    },
    /// A command failed (trap, fatal, transport, timeout)
    CommandException {
        command: String,
        duration: Duration,
        reason: String,
    },
    /// A worker was checked out of a pool
    PoolCheckout {
        system_time: SystemTime,
        pool: String,
        /// Command the checkout was made for, when known
        command: Option<String>,
    },
    /// A worker was returned to a pool
    PoolCheckin {
        pool: String,
        command: Option<String>,
        /// Time the worker spent checked out
        duration: Duration,
    },
}

/// Observer for [`TelemetryEvent`]s.
///
/// Implementations must be cheap and non-blocking; they run inline on the
/// worker's execution path.
pub trait TelemetryHook: Send + Sync + 'static {
    fn emit(&self, event: TelemetryEvent);
}

/// Default observer that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl TelemetryHook for NoopTelemetry {
    fn emit(&self, _event: TelemetryEvent) {}
}

/// Observer that forwards events to `tracing` at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl TelemetryHook for TracingTelemetry {
    fn emit(&self, event: TelemetryEvent) {
        match event {
            TelemetryEvent::ConnectionStart {
                system_time,
                host,
                port,
                tls,
            } => {
                tracing::debug!(?system_time, %host, port, tls, "connection.start");
            }
            TelemetryEvent::ConnectionStop {
                host,
                port,
                duration,
            } => {
                tracing::debug!(%host, port, ?duration, "connection.stop");
            }
            TelemetryEvent::ConnectionException {
                host,
                port,
                reason,
                duration,
            } => {
                tracing::debug!(%host, port, %reason, ?duration, "connection.exception");
            }
            TelemetryEvent::CommandStart {
                system_time,
                command,
            } => {
                tracing::debug!(?system_time, %command, "command.start");
            }
            TelemetryEvent::CommandStop {
                command,
                duration,
                result_count,
            } => {
                tracing::debug!(%command, ?duration, result_count, "command.stop");
            }
            TelemetryEvent::CommandException {
                command,
                duration,
                reason,
            } => {
                tracing::debug!(%command, ?duration, %reason, "command.exception");
            }
            TelemetryEvent::PoolCheckout {
                system_time,
                pool,
                command,
            } => {
                tracing::debug!(?system_time, %pool, ?command, "pool.checkout");
            }
            TelemetryEvent::PoolCheckin {
                pool,
                command,
                duration,
            } => {
                tracing::debug!(%pool, ?command, ?duration, "pool.checkin");
            }
        }
    }
}
