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

//! Unauthenticated enrollment client.
//!
//! Enrollment is a two-step exchange that runs before any client certificate
//! exists:
//!
//! 1. `GET` the one-time configuration URL to discover the CSR endpoint and the
//!    certificate subject.
//! 2. `POST` the CSR to the CSR endpoint and receive the signed certificate.

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use crate::config::ConnectorConfig;
use crate::error::{ConnectError, Result};
use crate::tls::build_http_client;
use crate::types::{CertificateResponse, CsrRequest, EnrollmentInfo};

/// Client for the discovery and signing endpoints.
///
/// # Example
///
/// ```no_run
/// use kyma_connector::{ConnectorConfig, EnrollmentClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = EnrollmentClient::new(&ConnectorConfig::default())?;
/// let info = client
///     .fetch_enrollment_info("https://connector.example.com/v1/applications/signingRequests/info?token=abc")
///     .await?;
/// println!("Subject: {}", info.certificate.subject);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EnrollmentClient {
    http: reqwest::Client,
}

impl EnrollmentClient {
    /// Create a new enrollment client.
    ///
    /// # Errors
    ///
    /// Returns an error if TLS configuration fails.
    pub fn new(config: &ConnectorConfig) -> Result<Self> {
        let http = build_http_client(config, None)?;
        Ok(Self { http })
    }

    /// Fetch the enrollment info from the configuration URL.
    ///
    /// Expects `200 OK` with a JSON body. Any other status, a transport
    /// failure or an unparsable body fails with
    /// [`ConnectError::DiscoveryFailed`].
    pub async fn fetch_enrollment_info(&self, configuration_url: &str) -> Result<EnrollmentInfo> {
        self.fetch_enrollment_info_raw(configuration_url)
            .await
            .map(|(info, _)| info)
    }

    /// Like [`fetch_enrollment_info`](Self::fetch_enrollment_info), also
    /// returning the response body exactly as received.
    pub async fn fetch_enrollment_info_raw(
        &self,
        configuration_url: &str,
    ) -> Result<(EnrollmentInfo, String)> {
        if configuration_url.trim().is_empty() {
            return Err(ConnectError::MissingEndpoint("configuration URL"));
        }

        let url = Url::parse(configuration_url).map_err(|e| {
            ConnectError::discovery(configuration_url, format!("Invalid URL: {}", e))
        })?;
        debug!("GET {}", url);

        let response =
            self.http.get(url).send().await.map_err(|e| {
                ConnectError::discovery(configuration_url, format!("Request failed: {}", e))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ConnectError::discovery(configuration_url, format!("Failed to read body: {}", e))
        })?;

        if status != StatusCode::OK {
            return Err(ConnectError::discovery_with_body(
                configuration_url,
                format!("Unexpected status {}", status.as_u16()),
                body,
            ));
        }

        match serde_json::from_str(&body) {
            Ok(info) => Ok((info, body)),
            Err(e) => Err(ConnectError::discovery_with_body(
                configuration_url,
                format!("Invalid enrollment info: {}", e),
                body,
            )),
        }
    }

    /// Submit a PEM CSR to the signing endpoint.
    ///
    /// Returns the decoded certificate PEM exactly as the server encoded it.
    pub async fn submit_csr(&self, csr_url: &str, csr_pem: &str) -> Result<String> {
        if csr_url.trim().is_empty() {
            return Err(ConnectError::MissingEndpoint("csrUrl"));
        }

        let url = Url::parse(csr_url)
            .map_err(|e| ConnectError::signing(csr_url, None, format!("Invalid URL: {}", e)))?;
        debug!("POST {}", url);

        let body = serde_json::to_vec(&CsrRequest::from_pem(csr_pem))
            .map_err(|e| ConnectError::request_encoding(e.to_string()))?;

        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ConnectError::transport("submit CSR", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ConnectError::transport("submit CSR", e))?;

        if status != StatusCode::OK {
            return Err(ConnectError::signing(csr_url, Some(status.as_u16()), body));
        }

        let certificate: CertificateResponse = serde_json::from_str(&body).map_err(|e| {
            ConnectError::signing(
                csr_url,
                Some(status.as_u16()),
                format!("Invalid certificate response: {}", e),
            )
        })?;

        certificate.client_certificate_pem()
    }
}
