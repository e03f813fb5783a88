// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Transport abstraction (plain TCP or TLS)
//!
//! The transport is chosen once at connect time; there is no STARTTLS
//! upgrade. Everything above this layer sees a single byte-stream type.

use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};

pub(crate) enum Transport {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Plain(_) => f.write_str("Transport::Plain(TcpStream)"),
            Transport::Tls(_) => f.write_str("Transport::Tls(TlsStream)"),
        }
    }
}

impl Transport {
    /// Dials the configured endpoint, performing the TLS handshake
    /// immediately when the config asks for it.
    pub(crate) async fn connect(config: &ClientConfig) -> Result<Self> {
        let host = config.host.as_str();
        let port = config.effective_port();

        tracing::trace!("Attempting TCP connection to {}:{}", host, port);
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| ApiError::ConnectionFailed(format!("dial {host}:{port}: {e}")))?;

        if !config.use_tls() {
            tracing::trace!("TCP connection established to {}:{}", host, port);
            return Ok(Self::Plain(stream));
        }

        let tls_config = config.tls_options.client_config()?;
        let server_name = config.tls_options.server_name(host)?;
        let connector = TlsConnector::from(tls_config);
        let tls_stream = connector
            .connect(server_name, stream)
            .await
            .map_err(|e| ApiError::ConnectionFailed(format!("TLS handshake failed: {e}")))?;

        tracing::trace!("TLS connection established to {}:{}", host, port);
        Ok(Self::Tls(Box::new(tls_stream)))
    }
}

impl AsyncRead for Transport {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Transport::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Transport::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Transport {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            Transport::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Transport::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Transport::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Transport::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Transport::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Transport::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}
