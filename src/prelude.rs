// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Prelude module for convenient imports
//!
//! Users of the library can import everything they need with:
//!
//! ```rust
//! use routeros_client::prelude::*;
//! ```

// Core types
pub use crate::config::ClientConfig;
pub use crate::error::{ApiError, Result};

// Connection and pool
pub use crate::client::Client;
pub use crate::connection::Connection;
pub use crate::pool::{Pool, PoolGuard, PoolStatus};

// Reply types
pub use crate::connection::parse::{AttributeMap, ReplyStatus, ReplyValue};

// TLS
pub use crate::connection::tls::{TlsOptions, TlsVerification};

// Telemetry
pub use crate::telemetry::{NoopTelemetry, TelemetryEvent, TelemetryHook, TracingTelemetry};
