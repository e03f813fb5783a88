//! High-level single-connection client

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::ClientConfig;
use crate::connection::parse::AttributeMap;
use crate::connection::Connection;
use crate::error::Result;
use crate::telemetry::{NoopTelemetry, TelemetryHook};

/// Single-connection RouterOS API client
///
/// Wraps one authenticated connection behind a mutex: commands issued
/// through a handle are serialized, and the handle is cheap to clone and
/// share between tasks. For concurrent command fan-out use [`crate::Pool`].
#[derive(Clone)]
pub struct Client {
    conn: Arc<Mutex<Connection>>,
}

impl Client {
    /// Connects and authenticates, deriving TLS from the configured port.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        Self::connect_with_telemetry(config, Arc::new(NoopTelemetry)).await
    }

    /// Same as [`Client::connect`] with an injected telemetry observer.
    pub async fn connect_with_telemetry(
        config: ClientConfig,
        telemetry: Arc<dyn TelemetryHook>,
    ) -> Result<Self> {
        let conn = Connection::open_with_telemetry(config, telemetry).await?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Connects without TLS regardless of the configured port.
    pub async fn connect_plain(mut config: ClientConfig) -> Result<Self> {
        config.tls = Some(false);
        Self::connect(config).await
    }

    /// Connects with TLS regardless of the configured port.
    pub async fn connect_tls(mut config: ClientConfig) -> Result<Self> {
        config.tls = Some(true);
        Self::connect(config).await
    }

    /// Runs one command and returns the parsed reply rows.
    pub async fn command<W: AsRef<str>>(&self, words: &[W]) -> Result<Vec<AttributeMap>> {
        self.conn.lock().await.execute(words).await
    }

    /// Closes the connection. Idempotent; pending commands on other clones
    /// of this handle observe [`crate::ApiError::Closed`] afterwards.
    pub async fn close(&self) {
        self.conn.lock().await.close().await;
    }

    #[must_use]
    pub async fn is_alive(&self) -> bool {
        self.conn.lock().await.is_alive()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}
