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

//! # kyma-connector
//!
//! A client-side connector that enrolls an application into a cluster's trust
//! domain and then talks to the application APIs over mutual TLS.
//!
//! Enrollment starts from a one-time configuration URL. The connector
//! discovers the CSR endpoint and the certificate subject, generates a fresh
//! key pair and CSR, gets the CSR signed, persists the key material and builds
//! an HTTP client that presents the new certificate.
//!
//! ## Features
//!
//! - **Async-first design** using Tokio
//! - **Lifecycle**: enroll, resume from storage, renew, revoke
//! - **Pluggable storage** through the [`KeyStore`] trait
//! - **Management calls**: service registration and events over the enrolled identity
//!
//! ## Quick Start
//!
//! ```no_run
//! use kyma_connector::{Connector, ConnectorConfig, MemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut connector = Connector::new(MemoryStore::new(), ConnectorConfig::default());
//!
//!     connector
//!         .enroll("https://connector.example.com/v1/applications/signingRequests/info?token=abc")
//!         .await?;
//!
//!     for event in connector.subscribed_events().await? {
//!         println!("{} {}", event.name, event.version);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Resuming
//!
//! ```no_run
//! use kyma_connector::{Connector, ConnectorConfig, FileStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = FileStore::new("/var/lib/kyma-connect")?;
//! let mut connector = Connector::open(store, ConnectorConfig::default())?;
//!
//! // Rotate the key pair and certificate
//! connector.renew().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod client;
pub mod config;
pub mod connector;
pub mod csr;
pub mod dn;
pub mod enrollment;
pub mod error;
pub mod logging;
pub mod store;
pub mod tls;
pub mod types;

// Re-export main types at crate root for convenience
pub use client::SecureClient;
pub use config::{ConnectorConfig, ConnectorConfigBuilder, TrustAnchors};
pub use connector::Connector;
pub use csr::{CsrBuilder, GeneratedCsr, KeyAlgorithm};
pub use dn::DistinguishedName;
pub use enrollment::EnrollmentClient;
pub use error::{ConnectError, Result};
pub use store::{FileStore, KeyStore, MemoryStore};
pub use types::{ConnectorState, EnrollmentInfo, EventInfo, KeyMaterial, RuntimeInfo};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent string for HTTP requests.
pub const USER_AGENT: &str = concat!("kyma-connector/", env!("CARGO_PKG_VERSION"));
