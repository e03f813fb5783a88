//! Client library for the MikroTik RouterOS binary API
//!
//! Connects to the RouterOS management endpoint (plain TCP or TLS),
//! authenticates with the post-6.43 plain login and falls back to the
//! legacy MD5 challenge/response, and exchanges length-prefixed
//! word/sentence requests for typed replies.
//!
//! ```rust,no_run
//! use routeros_client::{Client, ClientConfig};
//!
//! # async fn run() -> routeros_client::Result<()> {
//! let config = ClientConfig::new("192.168.88.1", "admin", "secret");
//! let client = Client::connect(config).await?;
//!
//! let interfaces = client.command(&["/interface/print"]).await?;
//! for row in &interfaces {
//!     println!("{:?}", row.get("name"));
//! }
//! client.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! For concurrent workloads, [`Pool`] owns a fixed set of connections with
//! checkout/checkin semantics:
//!
//! ```rust,no_run
//! use routeros_client::{ClientConfig, Pool};
//!
//! # async fn run() -> routeros_client::Result<()> {
//! let pool = Pool::start(ClientConfig::new("192.168.88.1", "admin", "secret"))?;
//! let routes = pool.command(&["/ip/route/print"]).await?;
//! pool.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod pool;
pub mod prelude;
pub mod telemetry;

// Re-export commonly used types
pub use client::Client;
pub use config::ClientConfig;
pub use connection::parse::{AttributeMap, ReplyStatus, ReplyValue};
pub use connection::tls::{TlsOptions, TlsVerification};
pub use connection::{protocol, Connection};
pub use error::{ApiError, Result};
pub use pool::{Pool, PoolGuard, PoolStatus};
pub use telemetry::{NoopTelemetry, TelemetryEvent, TelemetryHook, TracingTelemetry};
