// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Low-level RouterOS API connection handling
//!
//! A [`Connection`] owns exactly one transport and is its sole reader and
//! writer. Commands are serialized by `&mut self`; a `!trap` reply leaves
//! the connection usable, every other failure poisons it.

mod auth;
pub mod parse;
pub mod protocol;
pub mod tls;
mod transport;

use std::sync::Arc;
use std::time::{Instant, SystemTime};

use secrecy::ExposeSecret;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::telemetry::{NoopTelemetry, TelemetryEvent, TelemetryHook};
use parse::{parse_block, AttributeMap};
use transport::Transport;

/// A single authenticated API connection
pub struct Connection {
    transport: Transport,
    config: ClientConfig,
    telemetry: Arc<dyn TelemetryHook>,
    alive: bool,
    stopped: bool,
    opened_at: Instant,
}

impl Connection {
    /// Dials, handshakes, and logs in under the config's dial timeout.
    pub async fn open(config: ClientConfig) -> Result<Self> {
        Self::open_with_telemetry(config, Arc::new(NoopTelemetry)).await
    }

    /// Same as [`Connection::open`] with an injected telemetry observer.
    pub async fn open_with_telemetry(
        config: ClientConfig,
        telemetry: Arc<dyn TelemetryHook>,
    ) -> Result<Self> {
        config.validate().map_err(ApiError::ConnectionFailed)?;

        let host = config.host.clone();
        let port = config.effective_port();
        telemetry.emit(TelemetryEvent::ConnectionStart {
            system_time: SystemTime::now(),
            host: host.clone(),
            port,
            tls: config.use_tls(),
        });
        let started = Instant::now();

        let dial = async {
            let mut transport = Transport::connect(&config).await?;
            auth::login(
                &mut transport,
                &config.username,
                config.password.expose_secret(),
            )
            .await?;
            Ok::<Transport, ApiError>(transport)
        };

        let result = match timeout(config.dial_timeout(), dial).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout(config.dial_timeout())),
        };

        match result {
            Ok(transport) => {
                tracing::debug!("Connection to {}:{} authenticated", host, port);
                Ok(Self {
                    transport,
                    config,
                    telemetry,
                    alive: true,
                    stopped: false,
                    opened_at: started,
                })
            }
            Err(err) => {
                telemetry.emit(TelemetryEvent::ConnectionException {
                    host,
                    port,
                    reason: err.kind().to_string(),
                    duration: started.elapsed(),
                });
                Err(err)
            }
        }
    }

    /// Runs one command to its terminal status and parses the reply.
    ///
    /// At most one command is in flight per connection; `&mut self`
    /// enforces the serialization. When the per-command deadline elapses
    /// the connection is poisoned, since partial wire state cannot be
    /// recovered.
    pub async fn execute<W: AsRef<str>>(&mut self, words: &[W]) -> Result<Vec<AttributeMap>> {
        if !self.alive {
            return Err(ApiError::Closed);
        }

        let command = words
            .first()
            .map(|w| w.as_ref().to_string())
            .unwrap_or_default();
        self.telemetry.emit(TelemetryEvent::CommandStart {
            system_time: SystemTime::now(),
            command: command.clone(),
        });
        let started = Instant::now();

        // Poisoned until the reply is fully consumed: a caller that cancels
        // mid-command must not be able to check a half-read connection back
        // into a pool.
        self.alive = false;
        let result = self.execute_inner(words).await;
        match &result {
            Ok(rows) => {
                self.alive = true;
                self.telemetry.emit(TelemetryEvent::CommandStop {
                    command,
                    duration: started.elapsed(),
                    result_count: rows.len(),
                });
            }
            Err(err) => {
                if err.closes_connection() {
                    tracing::debug!(
                        "Connection to {} poisoned by {} error",
                        self.config.host,
                        err.kind()
                    );
                } else {
                    self.alive = true;
                }
                self.telemetry.emit(TelemetryEvent::CommandException {
                    command,
                    duration: started.elapsed(),
                    reason: err.kind().to_string(),
                });
            }
        }
        result
    }

    async fn execute_inner<W: AsRef<str>>(&mut self, words: &[W]) -> Result<Vec<AttributeMap>> {
        let limit = self.config.command_timeout();
        let transport = &mut self.transport;
        let io = async {
            protocol::write_sentence(transport, words).await?;
            protocol::read_block(transport).await
        };
        let block = match limit {
            Some(deadline) => timeout(deadline, io)
                .await
                .map_err(|_| ApiError::Timeout(deadline))??,
            None => io.await?,
        };
        parse_block(&block)
    }

    /// Closes the connection. Idempotent; later `execute` calls observe
    /// [`ApiError::Closed`].
    pub async fn close(&mut self) {
        if self.stopped {
            return;
        }
        self.alive = false;
        self.stopped = true;
        let _ = self.transport.shutdown().await;
        self.emit_stop();
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    fn emit_stop(&self) {
        self.telemetry.emit(TelemetryEvent::ConnectionStop {
            host: self.config.host.clone(),
            port: self.config.effective_port(),
            duration: self.opened_at.elapsed(),
        });
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // A worker discarded without an explicit close still reports its
        // lifetime; the socket itself closes with the transport.
        if !self.stopped {
            self.stopped = true;
            self.emit_stop();
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.config.host)
            .field("port", &self.config.effective_port())
            .field("alive", &self.alive)
            .finish_non_exhaustive()
    }
}
