// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Connector message types and the persisted key material.
//!
//! The JSON field names follow the connector service's wire format and must
//! not change, since existing stores hold documents in this shape.

use std::fmt;

use base64::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ConnectError, Result};

/// Response of the configuration (discovery) endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentInfo {
    /// Endpoint that signs the CSR.
    #[serde(default)]
    pub csr_url: String,
    /// Management API endpoints.
    #[serde(default)]
    pub api: ApiUrls,
    /// Requirements for the requested certificate.
    #[serde(default)]
    pub certificate: CertificateInfo,
}

/// Management endpoints announced during discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUrls {
    /// Subscribed events listing.
    #[serde(default)]
    pub events_info_url: String,
    /// Event publishing.
    #[serde(default)]
    pub events_url: String,
    /// Service registration.
    #[serde(default)]
    pub metadata_url: String,
    /// Runtime info endpoint, called with the client certificate.
    #[serde(default)]
    pub info_url: String,
    /// Certificate management.
    #[serde(default)]
    pub certificates_url: String,
}

/// Certificate requirements from the discovery response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateInfo {
    /// Distinguished name string, e.g. `O=Org,OU=Unit,C=DE,CN=my-app`.
    #[serde(default)]
    pub subject: String,
    /// Requested extensions (unused).
    #[serde(default)]
    pub extensions: String,
    /// Key algorithm hint, e.g. `rsa2048`.
    #[serde(rename = "key-algorithm", default)]
    pub key_algorithm: String,
}

/// Response of the info endpoint, fetched over mutual TLS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeInfo {
    /// Identity bound to the certificate.
    #[serde(default)]
    pub client_identity: ClientIdentity,
    /// Endpoints for the enrolled application.
    #[serde(default)]
    pub urls: RuntimeUrls,
}

/// Identity the connector service associates with the client certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIdentity {
    /// Application name.
    #[serde(default)]
    pub application: String,
}

/// Endpoints available to an enrolled application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeUrls {
    /// Subscribed events listing.
    #[serde(default)]
    pub events_info_url: String,
    /// Event publishing.
    #[serde(default)]
    pub events_url: String,
    /// Service registration.
    #[serde(default)]
    pub metadata_url: String,
    /// Certificate renewal.
    #[serde(default)]
    pub renew_cert_url: String,
    /// Certificate revocation.
    #[serde(default)]
    pub revoke_cert_url: String,
}

/// Body posted to the signing and renewal endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrRequest {
    /// Base64 of the PEM-encoded CSR.
    pub csr: String,
}

impl CsrRequest {
    /// Wrap a PEM-encoded CSR.
    pub fn from_pem(csr_pem: &str) -> Self {
        Self {
            csr: BASE64_STANDARD.encode(csr_pem.as_bytes()),
        }
    }
}

/// Response of the signing and renewal endpoints.
///
/// Every field holds base64 of PEM text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateResponse {
    /// Full chain.
    #[serde(default)]
    pub crt: String,
    /// Client certificate.
    #[serde(rename = "clientCrt", alias = "clientCRT")]
    pub client_crt: String,
    /// Issuing CA certificate.
    #[serde(rename = "caCrt", alias = "caCRT", default)]
    pub ca_crt: String,
}

impl CertificateResponse {
    /// Decode the client certificate into PEM text.
    ///
    /// The decoded text is returned as is, without any re-encoding.
    pub fn client_certificate_pem(&self) -> Result<String> {
        decode_pem_field("clientCrt", &self.client_crt)
    }
}

fn decode_pem_field(field: &str, value: &str) -> Result<String> {
    let bytes = BASE64_STANDARD.decode(value.trim()).map_err(|e| {
        ConnectError::certificate_decode(format!("Field '{}' is not valid base64: {}", field, e))
    })?;

    String::from_utf8(bytes).map_err(|e| {
        ConnectError::certificate_decode(format!("Field '{}' is not valid UTF-8: {}", field, e))
    })
}

/// Response of the service registration endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceId {
    /// Service ID assigned by the server.
    pub id: String,
}

/// An event the application is subscribed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInfo {
    /// Event type.
    pub name: String,
    /// Event version.
    pub version: String,
}

/// Wrapper of the events info endpoint response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsInfo {
    /// Subscribed events.
    #[serde(default)]
    pub events_info: Vec<EventInfo>,
}

/// PEM key material owned by the connector.
///
/// The CSR and private key are set together; the certificate follows once the
/// CSR has been signed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct KeyMaterial {
    /// PEM private key.
    pub private_key: String,
    /// PEM CSR the certificate was issued for.
    pub csr: String,
    /// PEM client certificate.
    pub certificate: Option<String>,
}

impl KeyMaterial {
    /// Create key material for a signed certificate.
    pub fn new(
        private_key: impl Into<String>,
        csr: impl Into<String>,
        certificate: impl Into<String>,
    ) -> Self {
        Self {
            private_key: private_key.into(),
            csr: csr.into(),
            certificate: Some(certificate.into()),
        }
    }

    /// Returns true if a certificate has been issued.
    pub fn has_certificate(&self) -> bool {
        self.certificate.is_some()
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("private_key", &"<redacted>")
            .field("csr", &self.csr)
            .field("certificate", &self.certificate)
            .finish()
    }
}

/// Lifecycle state of the connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    /// No key material yet.
    Unenrolled,
    /// A CSR and private key exist but no certificate.
    CsrIssued,
    /// A certificate is held and a secure client is available.
    Enrolled,
    /// The certificate was revoked by the connector service.
    Revoked,
}

impl fmt::Display for ConnectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unenrolled => "unenrolled",
            Self::CsrIssued => "csr-issued",
            Self::Enrolled => "enrolled",
            Self::Revoked => "revoked",
        };
        f.write_str(s)
    }
}
