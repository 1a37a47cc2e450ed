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

//! Integration tests for event publishing and subscriptions

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::integration::fixtures::enrolled_connector;
use crate::integration::{MockConnectorServer, PATH_EVENTS, PATH_EVENTS_INFO};
use kyma_connector::{ConnectError, Connector, ConnectorConfig, EventInfo, MemoryStore};

async fn mock_subscriptions(mock: &MockConnectorServer) {
    Mock::given(method("GET"))
        .and(path(PATH_EVENTS_INFO))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "eventsInfo": [
                { "name": "order.created", "version": "v1" },
                { "name": "order.shipped", "version": "v2" }
            ]
        })))
        .mount(mock.inner())
        .await;
}

#[tokio::test]
async fn test_subscribed_events() {
    let mock = MockConnectorServer::start().await;
    let connector = enrolled_connector(&mock, MemoryStore::new()).await;
    mock_subscriptions(&mock).await;

    let events = connector
        .subscribed_events()
        .await
        .expect("listing events failed");

    assert_eq!(
        events,
        vec![
            EventInfo {
                name: "order.created".to_string(),
                version: "v1".to_string(),
            },
            EventInfo {
                name: "order.shipped".to_string(),
                version: "v2".to_string(),
            },
        ]
    );
}

#[tokio::test]
async fn test_subscribed_events_after_resume() {
    let mock = MockConnectorServer::start().await;
    let store = Arc::new(MemoryStore::new());
    enrolled_connector(&mock, Arc::clone(&store)).await;
    mock_subscriptions(&mock).await;

    // Test: A resumed identity can call the gateway right away
    let connector = Connector::open(store, ConnectorConfig::default()).expect("resume failed");
    let events = connector
        .subscribed_events()
        .await
        .expect("listing events failed");

    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn test_publish_event() {
    let mock = MockConnectorServer::start().await;
    let connector = enrolled_connector(&mock, MemoryStore::new()).await;

    let event = json!({
        "event-type": "order.created",
        "event-type-version": "v1",
        "event-time": "2026-01-15T10:00:00Z",
        "data": { "orderId": "42" }
    });

    Mock::given(method("POST"))
        .and(path(PATH_EVENTS))
        .and(body_json(event.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "event-id": "abc" })))
        .expect(1)
        .mount(mock.inner())
        .await;

    let result = connector.publish_event(&event).await;
    assert!(result.is_ok(), "publish failed: {:?}", result.err());
}

#[tokio::test]
async fn test_publish_event_rejected() {
    let mock = MockConnectorServer::start().await;
    let connector = enrolled_connector(&mock, MemoryStore::new()).await;

    mock.mock_error(PATH_EVENTS, 400, "invalid event-type").await;

    let err = connector
        .publish_event(&json!({ "event-type": "" }))
        .await
        .unwrap_err();

    match err {
        ConnectError::ServerError {
            operation,
            status,
            message,
        } => {
            assert_eq!(operation, "publish event");
            assert_eq!(status, 400);
            assert_eq!(message, "invalid event-type");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
