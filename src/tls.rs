//! TLS configuration helpers for the connector.
//!
//! This module turns stored key material into a mutual-TLS HTTP client and
//! builds the plain client used before enrollment.

use der::Decode;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::EncodePrivateKey;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tracing::debug;

use crate::client::SecureClient;
use crate::config::{ConnectorConfig, TrustAnchors};
use crate::error::{ConnectError, Result};
use crate::types::KeyMaterial;

/// Build a reqwest Client with the configured trust anchors.
///
/// When `identity` is set it is presented on every TLS handshake.
pub fn build_http_client(
    config: &ConnectorConfig,
    identity: Option<reqwest::Identity>,
) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .use_rustls_tls()
        .user_agent(crate::USER_AGENT);

    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }

    match &config.trust_anchors {
        TrustAnchors::System => {
            builder = builder.tls_built_in_root_certs(true);
        }
        TrustAnchors::Explicit(ca_certs) => {
            builder = builder.tls_built_in_root_certs(false);
            for ca_pem in ca_certs {
                let certs = parse_pem_certificates(ca_pem).map_err(|e| {
                    ConnectError::tls_config(format!("Failed to parse CA certificate: {}", e))
                })?;
                for der in certs {
                    let cert = reqwest::Certificate::from_der(der.as_ref()).map_err(|e| {
                        ConnectError::tls_config(format!("Failed to load CA certificate: {}", e))
                    })?;
                    builder = builder.add_root_certificate(cert);
                }
            }
        }
    }

    if let Some(identity) = identity {
        builder = builder.identity(identity);
    }

    builder = builder.min_tls_version(reqwest::tls::Version::TLS_1_2);

    let mut headers = reqwest::header::HeaderMap::new();
    for (name, value) in &config.additional_headers {
        let header_name = reqwest::header::HeaderName::try_from(name.as_str())
            .map_err(|e| ConnectError::tls_config(format!("Invalid header '{}': {}", name, e)))?;
        let header_value = reqwest::header::HeaderValue::try_from(value.as_str()).map_err(|e| {
            ConnectError::tls_config(format!("Invalid value for header '{}': {}", name, e))
        })?;
        headers.insert(header_name, header_value);
    }
    builder = builder.default_headers(headers);

    builder
        .build()
        .map_err(|e| ConnectError::tls_config(format!("Failed to build HTTP client: {}", e)))
}

/// Build the mutual-TLS client for stored key material.
///
/// The leaf certificate must carry the public half of the private key. This is
/// checked before anything touches the network.
pub fn build_secure_client(
    key_material: &KeyMaterial,
    config: &ConnectorConfig,
) -> Result<SecureClient> {
    let certificate_pem = key_material
        .certificate
        .as_deref()
        .ok_or_else(|| ConnectError::invalid_key_material("No certificate in key material"))?;

    let certs = parse_pem_certificates(certificate_pem.as_bytes())?;
    let key = parse_pem_private_key(key_material.private_key.as_bytes())?;
    verify_key_pair(&certs[0], &key)?;

    let identity = build_reqwest_identity(certificate_pem, &key_material.private_key)?;
    let http = build_http_client(config, Some(identity))?;

    debug!("Built secure client for {} certificate(s)", certs.len());

    Ok(SecureClient::new(
        http,
        certificate_pem.to_string(),
        certs[0].as_ref().to_vec(),
    ))
}

/// Build a reqwest Identity from PEM-encoded certificate and key.
fn build_reqwest_identity(cert_pem: &str, key_pem: &str) -> Result<reqwest::Identity> {
    let mut pem_data = cert_pem.as_bytes().to_vec();
    pem_data.extend_from_slice(b"\n");
    pem_data.extend_from_slice(key_pem.as_bytes());

    reqwest::Identity::from_pem(&pem_data).map_err(|e| {
        ConnectError::invalid_key_material(format!("Failed to create client identity: {}", e))
    })
}

/// Check that the certificate was issued for the private key.
pub fn verify_key_pair(cert: &CertificateDer<'_>, key: &PrivateKeyDer<'_>) -> Result<()> {
    let certificate = x509_cert::Certificate::from_der(cert.as_ref()).map_err(|e| {
        ConnectError::invalid_key_material(format!("Failed to parse certificate: {}", e))
    })?;

    let key_pair = load_key_pair(key)?;

    let cert_public_key = certificate
        .tbs_certificate
        .subject_public_key_info
        .subject_public_key
        .raw_bytes();

    if cert_public_key != key_pair.public_key_raw() {
        return Err(ConnectError::invalid_key_material(
            "Certificate public key does not match the private key",
        ));
    }

    Ok(())
}

fn load_key_pair(key: &PrivateKeyDer<'_>) -> Result<rcgen::KeyPair> {
    let pkcs8 = match key {
        PrivateKeyDer::Pkcs8(pkcs8) => pkcs8.secret_pkcs8_der().to_vec(),
        PrivateKeyDer::Pkcs1(pkcs1) => {
            let rsa_key = rsa::RsaPrivateKey::from_pkcs1_der(pkcs1.secret_pkcs1_der())
                .map_err(|e| {
                    ConnectError::invalid_key_material(format!("Invalid RSA private key: {}", e))
                })?;
            rsa_key
                .to_pkcs8_der()
                .map_err(|e| {
                    ConnectError::invalid_key_material(format!("Invalid RSA private key: {}", e))
                })?
                .as_bytes()
                .to_vec()
        }
        _ => {
            return Err(ConnectError::invalid_key_material(
                "Unsupported private key format (expected PKCS#8 or PKCS#1)",
            ))
        }
    };

    rcgen::KeyPair::try_from(pkcs8.as_slice())
        .map_err(|e| ConnectError::invalid_key_material(format!("Invalid private key: {}", e)))
}

/// Parse PEM-encoded certificates.
pub fn parse_pem_certificates(pem_data: &[u8]) -> Result<Vec<CertificateDer<'static>>> {
    let mut reader = std::io::BufReader::new(pem_data);
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ConnectError::invalid_key_material(format!("Failed to parse PEM: {}", e)))?;

    if certs.is_empty() {
        return Err(ConnectError::invalid_key_material(
            "No certificates found in PEM data",
        ));
    }

    Ok(certs)
}

/// Parse a PEM-encoded private key.
pub fn parse_pem_private_key(pem_data: &[u8]) -> Result<PrivateKeyDer<'static>> {
    let mut reader = std::io::BufReader::new(pem_data);

    loop {
        match rustls_pemfile::read_one(&mut reader) {
            Ok(Some(rustls_pemfile::Item::Pkcs8Key(key))) => {
                return Ok(PrivateKeyDer::Pkcs8(key));
            }
            Ok(Some(rustls_pemfile::Item::Pkcs1Key(key))) => {
                return Ok(PrivateKeyDer::Pkcs1(key));
            }
            Ok(Some(rustls_pemfile::Item::Sec1Key(key))) => {
                return Ok(PrivateKeyDer::Sec1(key));
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => {
                return Err(ConnectError::invalid_key_material(format!(
                    "Failed to parse PEM: {:?}",
                    e
                )));
            }
        }
    }

    Err(ConnectError::invalid_key_material(
        "No private key found in PEM data",
    ))
}
