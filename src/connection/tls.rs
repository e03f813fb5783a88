// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! TLS configuration for API-SSL connections
//!
//! RouterOS devices ship with self-signed certificates by default, so the
//! verification mode is explicit: full verification against system roots
//! or a custom CA bundle, or a deliberate opt-out.

use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use rustls::RootCertStore;
use rustls_pemfile::Item;
use serde::Deserialize;
use std::fs;
use std::sync::Arc;

use crate::error::{ApiError, Result};

/// Server certificate verification mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TlsVerification {
    /// Verify the certificate chain and hostname (default)
    #[default]
    VerifyFull,
    /// Accept any server certificate. Only for routers with self-signed
    /// certificates on trusted networks.
    NoVerify,
}

/// TLS options, passed through opaquely to the transport layer
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsOptions {
    #[serde(default)]
    pub verification: TlsVerification,
    /// PEM bundle of trusted roots; system roots when unset
    #[serde(default)]
    pub ca_cert_path: Option<String>,
    /// SNI name to present; defaults to the config host
    #[serde(default)]
    pub sni_hostname: Option<String>,
    /// PEM client certificate chain, paired with `client_key_path`
    #[serde(default)]
    pub client_cert_path: Option<String>,
    /// PEM client private key, paired with `client_cert_path`
    #[serde(default)]
    pub client_key_path: Option<String>,
}

impl TlsOptions {
    /// Builds the rustls client configuration for these options.
    pub(crate) fn client_config(&self) -> Result<Arc<rustls::ClientConfig>> {
        let builder = rustls::ClientConfig::builder();
        let builder = match self.verification {
            TlsVerification::VerifyFull => {
                builder.with_root_certificates(self.root_store()?)
            }
            TlsVerification::NoVerify => {
                tracing::warn!("TLS server certificate verification is disabled");
                builder
                    .dangerous()
                    .with_custom_certificate_verifier(Arc::new(danger::NoVerification::new()))
            }
        };

        let config = match (&self.client_cert_path, &self.client_key_path) {
            (Some(cert_path), Some(key_path)) => {
                let certs = load_certs(cert_path)?;
                let key = load_key(key_path)?;
                builder.with_client_auth_cert(certs, key).map_err(|e| {
                    ApiError::ConnectionFailed(format!("invalid client certificate: {e}"))
                })?
            }
            (None, None) => builder.with_no_client_auth(),
            _ => {
                return Err(ApiError::ConnectionFailed(
                    "client certificate and key must be configured together".to_string(),
                ));
            }
        };

        Ok(Arc::new(config))
    }

    /// Resolves the SNI name: the explicit override or the dialled host.
    pub(crate) fn server_name(&self, host: &str) -> Result<ServerName<'static>> {
        let name = self
            .sni_hostname
            .as_deref()
            .unwrap_or(host)
            .trim_end_matches('.')
            .to_string();
        ServerName::try_from(name)
            .map_err(|_| ApiError::ConnectionFailed(format!("invalid TLS server name: '{host}'")))
    }

    fn root_store(&self) -> Result<RootCertStore> {
        if let Some(ca_path) = &self.ca_cert_path {
            return load_ca_bundle(ca_path);
        }

        let result = rustls_native_certs::load_native_certs();
        let mut store = RootCertStore::empty();
        for cert in result.certs {
            let _ = store.add_parsable_certificates(std::iter::once(cert));
        }
        if store.is_empty() {
            return Err(ApiError::ConnectionFailed(
                "failed to load any system root certificates".to_string(),
            ));
        }
        Ok(store)
    }
}

/// Loads trusted roots from a PEM bundle.
fn load_ca_bundle(ca_path: &str) -> Result<RootCertStore> {
    let ca_cert_data = fs::read(ca_path).map_err(|e| {
        ApiError::ConnectionFailed(format!("failed to read CA bundle '{ca_path}': {e}"))
    })?;

    let mut reader = std::io::Cursor::new(&ca_cert_data);
    let mut store = RootCertStore::empty();
    let mut found_certs = 0;

    loop {
        match rustls_pemfile::read_one(&mut reader) {
            Ok(Some(Item::X509Certificate(cert))) => {
                let _ = store.add_parsable_certificates(std::iter::once(cert));
                found_certs += 1;
            }
            Ok(Some(_)) => {
                // Skip non-certificate items (private keys, etc.)
            }
            Ok(None) => break,
            Err(_) => {
                return Err(ApiError::ConnectionFailed(format!(
                    "failed to parse CA bundle '{ca_path}'"
                )));
            }
        }
    }

    if found_certs == 0 {
        return Err(ApiError::ConnectionFailed(format!(
            "no valid certificates found in '{ca_path}'"
        )));
    }
    Ok(store)
}

fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>> {
    let data = fs::read(path).map_err(|e| {
        ApiError::ConnectionFailed(format!("failed to read client certificate '{path}': {e}"))
    })?;
    let mut reader = std::io::Cursor::new(&data);
    rustls_pemfile::certs(&mut reader)
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| {
            ApiError::ConnectionFailed(format!("failed to parse client certificate '{path}': {e}"))
        })
}

fn load_key(path: &str) -> Result<PrivateKeyDer<'static>> {
    let data = fs::read(path).map_err(|e| {
        ApiError::ConnectionFailed(format!("failed to read client key '{path}': {e}"))
    })?;
    let mut reader = std::io::Cursor::new(&data);
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| ApiError::ConnectionFailed(format!("failed to parse client key '{path}': {e}")))?
        .ok_or_else(|| ApiError::ConnectionFailed(format!("no private key found in '{path}'")))
}

mod danger {
    use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
    use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
    use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
    use rustls::{DigitallySignedStruct, SignatureScheme};
    use std::sync::Arc;

    /// Accepts any server certificate. Handshake signatures are still
    /// verified, so the peer must hold the certificate's private key.
    #[derive(Debug)]
    pub(super) struct NoVerification(Arc<CryptoProvider>);

    impl NoVerification {
        pub(super) fn new() -> Self {
            let provider = CryptoProvider::get_default()
                .cloned()
                .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()));
            Self(provider)
        }
    }

    impl ServerCertVerifier for NoVerification {
        fn verify_server_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _server_name: &ServerName<'_>,
            _ocsp_response: &[u8],
            _now: UnixTime,
        ) -> std::result::Result<ServerCertVerified, rustls::Error> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
            verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
        }

        fn verify_tls13_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
            verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            self.0.signature_verification_algorithms.supported_schemes()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = TlsOptions::default();
        assert_eq!(options.verification, TlsVerification::VerifyFull);
        assert!(options.ca_cert_path.is_none());
        assert!(options.sni_hostname.is_none());
    }

    #[test]
    fn test_server_name_from_host() {
        let options = TlsOptions::default();
        let name = options.server_name("router.lan").unwrap();
        assert_eq!(format!("{name:?}"), format!("{:?}", ServerName::try_from("router.lan").unwrap()));
    }

    #[test]
    fn test_server_name_override() {
        let options = TlsOptions {
            sni_hostname: Some("api.router.lan".to_string()),
            ..TlsOptions::default()
        };
        let name = options.server_name("192.168.88.1").unwrap();
        assert_eq!(
            format!("{name:?}"),
            format!("{:?}", ServerName::try_from("api.router.lan").unwrap())
        );
    }

    #[test]
    fn test_server_name_trailing_dot() {
        let options = TlsOptions::default();
        assert!(options.server_name("router.lan.").is_ok());
    }

    #[test]
    fn test_ip_server_name() {
        let options = TlsOptions::default();
        assert!(options.server_name("192.168.88.1").is_ok());
    }

    #[test]
    fn test_no_verify_config_builds() {
        let options = TlsOptions {
            verification: TlsVerification::NoVerify,
            ..TlsOptions::default()
        };
        let config = options.client_config().unwrap();
        assert!(!config.client_auth_cert_resolver.has_certs());
    }

    #[test]
    fn test_client_cert_requires_both_paths() {
        let options = TlsOptions {
            verification: TlsVerification::NoVerify,
            client_cert_path: Some("/tmp/cert.pem".to_string()),
            ..TlsOptions::default()
        };
        let err = options.client_config().unwrap_err();
        assert_eq!(err.kind(), "connection_failed");
    }

    #[test]
    fn test_missing_ca_bundle_fails() {
        let options = TlsOptions {
            ca_cert_path: Some("/nonexistent/ca.pem".to_string()),
            ..TlsOptions::default()
        };
        let err = options.client_config().unwrap_err();
        assert_eq!(err.kind(), "connection_failed");
    }

    #[test]
    fn test_verification_deserializes_kebab_case() {
        let full: TlsVerification = serde_json::from_str(r#""verify-full""#).unwrap();
        assert_eq!(full, TlsVerification::VerifyFull);
        let none: TlsVerification = serde_json::from_str(r#""no-verify""#).unwrap();
        assert_eq!(none, TlsVerification::NoVerify);
    }
}
