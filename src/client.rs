//! Mutual-TLS client for the connector APIs.
//!
//! A [`SecureClient`] presents the enrolled certificate on every handshake.
//! It is built by [`crate::tls::build_secure_client`] and used by the
//! connector for runtime info, renewal, revocation and the management calls.

use der::Decode;
use reqwest::StatusCode;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{ConnectError, Result};
use crate::types::{CertificateResponse, CsrRequest, EventInfo, EventsInfo, RuntimeInfo, ServiceId};

/// HTTP client bound to an enrolled identity.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct SecureClient {
    http: reqwest::Client,
    certificate_pem: String,
    leaf_der: Vec<u8>,
}

impl SecureClient {
    pub(crate) fn new(http: reqwest::Client, certificate_pem: String, leaf_der: Vec<u8>) -> Self {
        Self {
            http,
            certificate_pem,
            leaf_der,
        }
    }

    /// PEM certificate presented to servers.
    pub fn certificate_pem(&self) -> &str {
        &self.certificate_pem
    }

    /// SHA-256 fingerprint of the DER-encoded leaf certificate.
    pub fn fingerprint(&self) -> [u8; 32] {
        Sha256::digest(&self.leaf_der).into()
    }

    /// Fingerprint as a colon-separated hex string, e.g. `AB:CD:EF:...`.
    pub fn fingerprint_hex(&self) -> String {
        format_fingerprint(&self.fingerprint())
    }

    /// Common name of the leaf certificate's subject.
    pub fn common_name(&self) -> Option<String> {
        use const_oid::db::rfc4519::CN;

        let cert = x509_cert::Certificate::from_der(&self.leaf_der).ok()?;
        for rdn in cert.tbs_certificate.subject.0.iter() {
            for atv in rdn.0.iter() {
                if atv.oid == CN {
                    return std::str::from_utf8(atv.value.value())
                        .ok()
                        .map(str::to_string);
                }
            }
        }
        None
    }

    /// Underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Fetch the runtime info of the enrolled application.
    pub async fn fetch_runtime_info(&self, info_url: &str) -> Result<RuntimeInfo> {
        self.fetch_runtime_info_raw(info_url)
            .await
            .map(|(info, _)| info)
    }

    /// Like [`fetch_runtime_info`](Self::fetch_runtime_info), also returning
    /// the response body exactly as received.
    pub async fn fetch_runtime_info_raw(&self, info_url: &str) -> Result<(RuntimeInfo, Vec<u8>)> {
        const OP: &str = "fetch runtime info";
        debug!("GET {}", info_url);

        let response = self
            .http
            .get(info_url)
            .send()
            .await
            .map_err(|e| ConnectError::transport(OP, e))?;

        let response = expect_status(OP, response, StatusCode::OK).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| ConnectError::transport(OP, e))?;

        let info = serde_json::from_slice(&body).map_err(|e| {
            ConnectError::server_error(OP, 200, format!("Invalid response body: {}", e))
        })?;
        Ok((info, body.to_vec()))
    }

    /// Post a CSR to the renewal endpoint and return the new certificate PEM.
    ///
    /// Any success status is accepted.
    pub async fn renew(&self, renew_url: &str, csr_pem: &str) -> Result<String> {
        debug!("POST {}", renew_url);

        let response = self
            .http
            .post(renew_url)
            .json(&CsrRequest::from_pem(csr_pem))
            .send()
            .await
            .map_err(|e| ConnectError::transport("renew", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ConnectError::transport("renew", e))?;

        if !status.is_success() {
            return Err(ConnectError::signing(
                renew_url,
                Some(status.as_u16()),
                body,
            ));
        }

        let certificate: CertificateResponse = serde_json::from_str(&body).map_err(|e| {
            ConnectError::signing(
                renew_url,
                Some(status.as_u16()),
                format!("Invalid certificate response: {}", e),
            )
        })?;

        certificate.client_certificate_pem()
    }

    /// Ask the connector service to revoke the presented certificate.
    pub async fn revoke(&self, revoke_url: &str) -> Result<()> {
        const OP: &str = "revoke";
        debug!("POST {}", revoke_url);

        let response = self
            .http
            .post(revoke_url)
            .send()
            .await
            .map_err(|e| ConnectError::transport(OP, e))?;

        if !response.status().is_success() {
            return Err(error_response(OP, response).await);
        }

        Ok(())
    }

    /// Register a service document. Returns the assigned service ID.
    pub async fn register_service<T>(&self, metadata_url: &str, document: &T) -> Result<String>
    where
        T: Serialize + ?Sized,
    {
        const OP: &str = "register service";
        debug!("POST {}", metadata_url);

        let response = self
            .http
            .post(metadata_url)
            .json(document)
            .send()
            .await
            .map_err(|e| ConnectError::transport(OP, e))?;

        let response = expect_status(OP, response, StatusCode::OK).await?;
        let id: ServiceId = parse_json(OP, response).await?;
        Ok(id.id)
    }

    /// Replace the document of a registered service.
    pub async fn update_service<T>(&self, metadata_url: &str, id: &str, document: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        const OP: &str = "update service";
        let url = service_url(metadata_url, id);
        debug!("PUT {}", url);

        let response = self
            .http
            .put(&url)
            .json(document)
            .send()
            .await
            .map_err(|e| ConnectError::transport(OP, e))?;

        expect_status(OP, response, StatusCode::OK).await?;
        Ok(())
    }

    /// Delete a registered service.
    pub async fn delete_service(&self, metadata_url: &str, id: &str) -> Result<()> {
        const OP: &str = "delete service";
        let url = service_url(metadata_url, id);
        debug!("DELETE {}", url);

        let response = self
            .http
            .delete(&url)
            .send()
            .await
            .map_err(|e| ConnectError::transport(OP, e))?;

        expect_status(OP, response, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    /// Publish an event document.
    pub async fn publish_event<T>(&self, events_url: &str, event: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        const OP: &str = "publish event";
        debug!("POST {}", events_url);

        let response = self
            .http
            .post(events_url)
            .json(event)
            .send()
            .await
            .map_err(|e| ConnectError::transport(OP, e))?;

        expect_status(OP, response, StatusCode::OK).await?;
        Ok(())
    }

    /// List the events the application is subscribed to.
    pub async fn subscribed_events(&self, events_info_url: &str) -> Result<Vec<EventInfo>> {
        const OP: &str = "list subscribed events";
        debug!("GET {}", events_info_url);

        let response = self
            .http
            .get(events_info_url)
            .send()
            .await
            .map_err(|e| ConnectError::transport(OP, e))?;

        let response = expect_status(OP, response, StatusCode::OK).await?;
        let events: EventsInfo = parse_json(OP, response).await?;
        Ok(events.events_info)
    }
}

/// Format a fingerprint as a colon-separated hex string.
pub fn format_fingerprint(fp: &[u8; 32]) -> String {
    fp.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

fn service_url(metadata_url: &str, id: &str) -> String {
    format!("{}/{}", metadata_url.trim_end_matches('/'), id)
}

async fn expect_status(
    operation: &'static str,
    response: reqwest::Response,
    expected: StatusCode,
) -> Result<reqwest::Response> {
    if response.status() == expected {
        return Ok(response);
    }
    Err(error_response(operation, response).await)
}

async fn error_response(operation: &'static str, response: reqwest::Response) -> ConnectError {
    let status = response.status();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    ConnectError::server_error(operation, status.as_u16(), message)
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    operation: &'static str,
    response: reqwest::Response,
) -> Result<T> {
    let status = response.status().as_u16();
    let body = response
        .bytes()
        .await
        .map_err(|e| ConnectError::transport(operation, e))?;

    serde_json::from_slice(&body).map_err(|e| {
        ConnectError::server_error(operation, status, format!("Invalid response body: {}", e))
    })
}
