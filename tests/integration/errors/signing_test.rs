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

//! Integration tests for the signing exchange

use base64::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::integration::{MockConnectorServer, PATH_CSR};
use kyma_connector::{
    ConnectError, Connector, ConnectorConfig, ConnectorState, EnrollmentClient, MemoryStore,
};

const CERT_PEM: &str = "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";

fn csr_url(mock: &MockConnectorServer) -> String {
    format!("{}{}?token=one-time", mock.url(), PATH_CSR)
}

fn enrollment_client() -> EnrollmentClient {
    EnrollmentClient::new(&ConnectorConfig::default()).expect("client")
}

#[tokio::test]
async fn test_legacy_field_name_is_accepted() {
    let mock = MockConnectorServer::start().await;
    Mock::given(method("POST"))
        .and(path(PATH_CSR))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "clientCRT": BASE64_STANDARD.encode(CERT_PEM),
        })))
        .mount(mock.inner())
        .await;

    let certificate = enrollment_client()
        .submit_csr(&csr_url(&mock), "csr")
        .await
        .expect("submit failed");

    // Assert: The decoded PEM is returned untouched
    assert_eq!(certificate, CERT_PEM);
}

#[tokio::test]
async fn test_enrollment_with_legacy_field_name() {
    let mock = MockConnectorServer::start().await;
    mock.mock_enrollment_info("ecdsa-p256").await;
    mock.mock_signing_legacy_field().await;
    mock.mock_runtime_info().await;

    let mut connector = Connector::new(MemoryStore::new(), ConnectorConfig::default());
    let result = connector.enroll(&mock.configuration_url()).await;

    assert!(result.is_ok(), "enroll failed: {:?}", result.err());
    assert_eq!(connector.state(), ConnectorState::Enrolled);
}

#[tokio::test]
async fn test_signing_refused() {
    let mock = MockConnectorServer::start().await;
    mock.mock_error(PATH_CSR, 403, "token expired").await;

    let err = enrollment_client()
        .submit_csr(&csr_url(&mock), "csr")
        .await
        .unwrap_err();

    match err {
        ConnectError::SigningFailed {
            url,
            status,
            message,
        } => {
            assert_eq!(url, csr_url(&mock));
            assert_eq!(status, Some(403));
            assert_eq!(message, "token expired");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_signing_created_is_refused() {
    let mock = MockConnectorServer::start().await;
    Mock::given(method("POST"))
        .and(path(PATH_CSR))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "clientCrt": BASE64_STANDARD.encode(CERT_PEM),
        })))
        .mount(mock.inner())
        .await;

    let err = enrollment_client()
        .submit_csr(&csr_url(&mock), "csr")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ConnectError::SigningFailed {
            status: Some(201),
            ..
        }
    ));
}

#[tokio::test]
async fn test_signing_invalid_base64() {
    let mock = MockConnectorServer::start().await;
    Mock::given(method("POST"))
        .and(path(PATH_CSR))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "clientCrt": "!!! not base64 !!!",
        })))
        .mount(mock.inner())
        .await;

    let err = enrollment_client()
        .submit_csr(&csr_url(&mock), "csr")
        .await
        .unwrap_err();

    assert!(
        matches!(err, ConnectError::CertificateDecodeFailed(_)),
        "unexpected error: {:?}",
        err
    );
}

#[tokio::test]
async fn test_signing_missing_certificate_field() {
    let mock = MockConnectorServer::start().await;
    Mock::given(method("POST"))
        .and(path(PATH_CSR))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "crt": "" })))
        .mount(mock.inner())
        .await;

    let err = enrollment_client()
        .submit_csr(&csr_url(&mock), "csr")
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectError::SigningFailed { .. }));
}

#[tokio::test]
async fn test_signing_failure_persists_nothing() {
    let mock = MockConnectorServer::start().await;
    mock.mock_enrollment_info("ecdsa-p256").await;
    mock.mock_error(PATH_CSR, 500, "signer offline").await;

    let mut connector = Connector::new(MemoryStore::new(), ConnectorConfig::default());
    let err = connector
        .enroll(&mock.configuration_url())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ConnectError::SigningFailed {
            status: Some(500),
            ..
        }
    ));
    assert!(connector.store().is_empty());
    assert!(connector.key_material().is_none());
}
