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

//! Integration tests for service registration

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::integration::fixtures::enrolled_connector;
use crate::integration::{MockConnectorServer, PATH_METADATA};
use kyma_connector::{ConnectError, MemoryStore};

fn service_document() -> serde_json::Value {
    json!({
        "provider": "Example Corp",
        "name": "orders",
        "description": "Order management",
        "api": { "targetUrl": "https://orders.example.com/api" }
    })
}

#[tokio::test]
async fn test_register_service() {
    let mock = MockConnectorServer::start().await;
    let connector = enrolled_connector(&mock, MemoryStore::new()).await;

    // Mock registration that only accepts the exact document
    Mock::given(method("POST"))
        .and(path(PATH_METADATA))
        .and(body_json(service_document()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "123" })))
        .expect(1)
        .mount(mock.inner())
        .await;

    let id = connector
        .register_service(&service_document())
        .await
        .expect("register failed");

    assert_eq!(id, "123");
}

#[tokio::test]
async fn test_register_service_server_error() {
    let mock = MockConnectorServer::start().await;
    let connector = enrolled_connector(&mock, MemoryStore::new()).await;

    mock.mock_error(PATH_METADATA, 500, "metadata store unavailable")
        .await;

    let err = connector
        .register_service(&service_document())
        .await
        .unwrap_err();

    match err {
        ConnectError::ServerError {
            operation,
            status,
            message,
        } => {
            assert_eq!(operation, "register service");
            assert_eq!(status, 500);
            assert_eq!(message, "metadata store unavailable");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_update_service() {
    let mock = MockConnectorServer::start().await;
    let connector = enrolled_connector(&mock, MemoryStore::new()).await;

    Mock::given(method("PUT"))
        .and(path(format!("{}/123", PATH_METADATA)))
        .and(body_json(service_document()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(mock.inner())
        .await;

    let result = connector
        .update_service("123", &service_document())
        .await;
    assert!(result.is_ok(), "update failed: {:?}", result.err());
}

#[tokio::test]
async fn test_delete_service() {
    let mock = MockConnectorServer::start().await;
    let connector = enrolled_connector(&mock, MemoryStore::new()).await;

    Mock::given(method("DELETE"))
        .and(path(format!("{}/123", PATH_METADATA)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(mock.inner())
        .await;

    let result = connector.delete_service("123").await;
    assert!(result.is_ok(), "delete failed: {:?}", result.err());
}

#[tokio::test]
async fn test_delete_unknown_service() {
    let mock = MockConnectorServer::start().await;
    let connector = enrolled_connector(&mock, MemoryStore::new()).await;

    Mock::given(method("DELETE"))
        .and(path(format!("{}/missing", PATH_METADATA)))
        .respond_with(ResponseTemplate::new(404).set_body_string("service not found"))
        .mount(mock.inner())
        .await;

    let err = connector.delete_service("missing").await.unwrap_err();
    assert!(
        matches!(err, ConnectError::ServerError { status: 404, .. }),
        "unexpected error: {:?}",
        err
    );
}
