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

//! Configuration types for the connector.
//!
//! This module provides the transport and key generation settings shared by
//! the enrollment client and the secure client.

use std::time::Duration;

use crate::csr::KeyAlgorithm;

/// Configuration for the connector.
#[derive(Clone, Default)]
pub struct ConnectorConfig {
    /// Trust anchor configuration for server certificate verification.
    pub trust_anchors: TrustAnchors,

    /// Transport timeout applied to every request.
    ///
    /// `None` leaves requests without a deadline.
    pub timeout: Option<Duration>,

    /// Key algorithm for generated keys.
    ///
    /// Overrides the `key-algorithm` hint returned by discovery.
    pub key_algorithm: Option<KeyAlgorithm>,

    /// Additional HTTP headers to include in requests.
    pub additional_headers: Vec<(String, String)>,
}

impl std::fmt::Debug for ConnectorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorConfig")
            .field("trust_anchors", &self.trust_anchors)
            .field("timeout", &self.timeout)
            .field("key_algorithm", &self.key_algorithm)
            .field("additional_headers", &self.additional_headers.len())
            .finish()
    }
}

impl ConnectorConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ConnectorConfigBuilder {
        ConnectorConfigBuilder::new()
    }
}

/// Builder for [`ConnectorConfig`].
#[derive(Default)]
pub struct ConnectorConfigBuilder {
    trust_anchors: Option<TrustAnchors>,
    timeout: Option<Duration>,
    key_algorithm: Option<KeyAlgorithm>,
    additional_headers: Vec<(String, String)>,
}

impl ConnectorConfigBuilder {
    /// Create a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the platform trust store plus bundled web PKI roots.
    pub fn trust_system_roots(mut self) -> Self {
        self.trust_anchors = Some(TrustAnchors::System);
        self
    }

    /// Use explicit CA certificates (PEM-encoded) for server verification.
    pub fn trust_explicit(mut self, ca_certs: Vec<Vec<u8>>) -> Self {
        self.trust_anchors = Some(TrustAnchors::Explicit(ca_certs));
        self
    }

    /// Set the transport timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Force a key algorithm regardless of the discovery hint.
    pub fn key_algorithm(mut self, algorithm: KeyAlgorithm) -> Self {
        self.key_algorithm = Some(algorithm);
        self
    }

    /// Add an additional HTTP header to all requests.
    pub fn add_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_headers.push((name.into(), value.into()));
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ConnectorConfig {
        ConnectorConfig {
            trust_anchors: self.trust_anchors.unwrap_or_default(),
            timeout: self.timeout,
            key_algorithm: self.key_algorithm,
            additional_headers: self.additional_headers,
        }
    }
}

/// Trust anchor configuration for server certificate verification.
#[derive(Clone, Default)]
pub enum TrustAnchors {
    /// Platform trust store plus bundled web PKI roots.
    #[default]
    System,

    /// Use explicit CA certificates (PEM-encoded).
    Explicit(Vec<Vec<u8>>),
}

impl std::fmt::Debug for TrustAnchors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "System"),
            Self::Explicit(certs) => write!(f, "Explicit({} certs)", certs.len()),
        }
    }
}
