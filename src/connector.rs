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

//! Identity lifecycle: enroll, resume, renew and revoke.
//!
//! A [`Connector`] owns the enrollment info, the runtime info and the key
//! material of one application identity, and mirrors them into a
//! [`KeyStore`]. In-memory state changes only after every step of an
//! operation has succeeded.
//!
//! # Example
//!
//! ```no_run
//! use kyma_connector::{Connector, ConnectorConfig, FileStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = FileStore::new("/var/lib/kyma-connect")?;
//! let mut connector = Connector::new(store, ConnectorConfig::default());
//!
//! connector
//!     .enroll("https://connector.example.com/v1/applications/signingRequests/info?token=abc")
//!     .await?;
//! println!("State: {}", connector.state());
//! # Ok(())
//! # }
//! ```

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::client::SecureClient;
use crate::config::ConnectorConfig;
use crate::csr::{self, KeyAlgorithm};
use crate::dn::DistinguishedName;
use crate::enrollment::EnrollmentClient;
use crate::error::{ConnectError, Result};
use crate::store::{artifacts, KeyStore};
use crate::tls::build_secure_client;
use crate::types::{ConnectorState, EnrollmentInfo, EventInfo, KeyMaterial, RuntimeInfo};

/// Lifecycle controller for one application identity.
pub struct Connector<S: KeyStore> {
    store: S,
    config: ConnectorConfig,
    enrollment_info: Option<EnrollmentInfo>,
    runtime_info: Option<RuntimeInfo>,
    key_material: Option<KeyMaterial>,
    secure_client: Option<SecureClient>,
    revoked: bool,
}

impl<S: KeyStore> std::fmt::Debug for Connector<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("state", &self.state())
            .field("config", &self.config)
            .field("enrollment_info", &self.enrollment_info)
            .field("runtime_info", &self.runtime_info)
            .finish()
    }
}

impl<S: KeyStore> Connector<S> {
    /// Create an unenrolled connector.
    pub fn new(store: S, config: ConnectorConfig) -> Self {
        Self {
            store,
            config,
            enrollment_info: None,
            runtime_info: None,
            key_material: None,
            secure_client: None,
            revoked: false,
        }
    }

    /// Create a connector and load a previously enrolled identity from `store`.
    pub fn open(store: S, config: ConnectorConfig) -> Result<Self> {
        let mut connector = Self::new(store, config);
        connector.resume()?;
        Ok(connector)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectorState {
        if self.revoked {
            return ConnectorState::Revoked;
        }
        match &self.key_material {
            None => ConnectorState::Unenrolled,
            Some(km) if !km.has_certificate() => ConnectorState::CsrIssued,
            Some(_) if self.secure_client.is_some() => ConnectorState::Enrolled,
            Some(_) => ConnectorState::CsrIssued,
        }
    }

    /// Enrollment info from discovery.
    pub fn enrollment_info(&self) -> Option<&EnrollmentInfo> {
        self.enrollment_info.as_ref()
    }

    /// Runtime info from the info endpoint.
    pub fn runtime_info(&self) -> Option<&RuntimeInfo> {
        self.runtime_info.as_ref()
    }

    /// Current key material.
    pub fn key_material(&self) -> Option<&KeyMaterial> {
        self.key_material.as_ref()
    }

    /// Mutual-TLS client for the current identity.
    pub fn secure_client(&self) -> Option<&SecureClient> {
        self.secure_client.as_ref()
    }

    /// Backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Connector configuration.
    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Enroll with the one-time configuration URL.
    ///
    /// Discovers the CSR endpoint and subject, generates a fresh key and CSR,
    /// gets it signed, persists the key material and fetches the runtime info
    /// over mutual TLS. Any failure aborts the whole operation and leaves the
    /// in-memory state untouched.
    pub async fn enroll(&mut self, configuration_url: &str) -> Result<()> {
        let client = EnrollmentClient::new(&self.config)?;
        let (enrollment_info, enrollment_body) =
            client.fetch_enrollment_info_raw(configuration_url).await?;

        if enrollment_info.csr_url.trim().is_empty() {
            return Err(ConnectError::MissingEndpoint("csrUrl"));
        }
        if enrollment_info.api.info_url.trim().is_empty() {
            return Err(ConnectError::MissingEndpoint("infoUrl"));
        }

        let subject = DistinguishedName::parse(&enrollment_info.certificate.subject);
        let algorithm = self.select_algorithm(&enrollment_info.certificate.key_algorithm);
        debug!("Generating {} key for subject '{}'", algorithm, subject);
        let generated = csr::generate(&subject, algorithm)?;

        let certificate = client
            .submit_csr(&enrollment_info.csr_url, &generated.csr_pem)
            .await?;

        let key_material =
            KeyMaterial::new(generated.private_key_pem, generated.csr_pem, certificate);

        self.write(artifacts::ENROLLMENT_INFO, enrollment_body.as_bytes())?;
        self.write_key_material(&key_material)?;

        let secure_client = build_secure_client(&key_material, &self.config)?;
        let (runtime_info, runtime_body) = secure_client
            .fetch_runtime_info_raw(&enrollment_info.api.info_url)
            .await?;
        self.write(artifacts::RUNTIME_INFO, &runtime_body)?;

        info!(
            "Enrolled application '{}'",
            runtime_info.client_identity.application
        );

        self.enrollment_info = Some(enrollment_info);
        self.runtime_info = Some(runtime_info);
        self.key_material = Some(key_material);
        self.secure_client = Some(secure_client);
        self.revoked = false;

        Ok(())
    }

    /// Load the persisted identity and rebuild the secure client.
    ///
    /// Makes no network call.
    pub fn resume(&mut self) -> Result<()> {
        let enrollment_info: EnrollmentInfo = self.read_json(artifacts::ENROLLMENT_INFO)?;
        let runtime_info: RuntimeInfo = self.read_json(artifacts::RUNTIME_INFO)?;

        let key_material = KeyMaterial::new(
            self.read_text(artifacts::PRIVATE_KEY)?,
            self.read_text(artifacts::CSR)?,
            self.read_text(artifacts::CERTIFICATE)?,
        );

        let secure_client = build_secure_client(&key_material, &self.config)?;

        info!(
            "Resumed identity for application '{}'",
            runtime_info.client_identity.application
        );

        self.enrollment_info = Some(enrollment_info);
        self.runtime_info = Some(runtime_info);
        self.key_material = Some(key_material);
        self.secure_client = Some(secure_client);
        self.revoked = false;

        Ok(())
    }

    /// Replace the identity with a freshly signed one.
    ///
    /// The new certificate is requested over the current mutual-TLS client.
    /// The previous certificate is not invalidated.
    pub async fn renew(&mut self) -> Result<()> {
        let client = self.require_client("renew")?;
        let renew_url = self
            .runtime_info
            .as_ref()
            .map(|info| info.urls.renew_cert_url.as_str())
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConnectError::MissingEndpoint("renewCertUrl"))?;

        let hint = self
            .enrollment_info
            .as_ref()
            .map(|info| info.certificate.key_algorithm.as_str())
            .unwrap_or_default();
        let algorithm = self.select_algorithm(hint);
        let subject = self.subject();
        let generated = csr::generate(&subject, algorithm)?;

        let certificate = client.renew(renew_url, &generated.csr_pem).await?;

        let key_material =
            KeyMaterial::new(generated.private_key_pem, generated.csr_pem, certificate);
        let secure_client = build_secure_client(&key_material, &self.config)?;
        if let Some(previous) = &self.key_material {
            self.replace_key_material(&key_material, previous)?;
        } else {
            self.write_key_material(&key_material)?;
        }

        info!("Renewed certificate for '{}'", subject);

        self.key_material = Some(key_material);
        self.secure_client = Some(secure_client);
        self.revoked = false;

        Ok(())
    }

    /// Ask the connector service to revoke the current certificate.
    ///
    /// The persisted key material is kept.
    pub async fn revoke(&mut self) -> Result<()> {
        let client = self.require_client("revoke")?;
        let revoke_url = self
            .runtime_info
            .as_ref()
            .map(|info| info.urls.revoke_cert_url.as_str())
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConnectError::MissingEndpoint("revokeCertUrl"))?;

        client.revoke(revoke_url).await?;

        info!("Revoked certificate for '{}'", self.subject());
        self.revoked = true;

        Ok(())
    }

    /// Register a service document. Returns the assigned service ID.
    pub async fn register_service<T>(&self, document: &T) -> Result<String>
    where
        T: Serialize + ?Sized,
    {
        let client = self.require_client("register service")?;
        let url = self.metadata_url()?;
        client.register_service(url, document).await
    }

    /// Replace the document of a registered service.
    pub async fn update_service<T>(&self, id: &str, document: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let client = self.require_client("update service")?;
        let url = self.metadata_url()?;
        client.update_service(url, id, document).await
    }

    /// Delete a registered service.
    pub async fn delete_service(&self, id: &str) -> Result<()> {
        let client = self.require_client("delete service")?;
        let url = self.metadata_url()?;
        client.delete_service(url, id).await
    }

    /// Publish an event document.
    pub async fn publish_event<T>(&self, event: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let client = self.require_client("publish event")?;
        let url = self.resolve_url(
            "eventsUrl",
            |r| &r.urls.events_url,
            |e| &e.api.events_url,
        )?;
        client.publish_event(url, event).await
    }

    /// List the events the application is subscribed to.
    pub async fn subscribed_events(&self) -> Result<Vec<EventInfo>> {
        let client = self.require_client("list subscribed events")?;
        let url = self.resolve_url(
            "eventsInfoUrl",
            |r| &r.urls.events_info_url,
            |e| &e.api.events_info_url,
        )?;
        client.subscribed_events(url).await
    }

    fn require_client(&self, operation: &'static str) -> Result<SecureClient> {
        self.secure_client
            .clone()
            .ok_or(ConnectError::NotEnrolled { operation })
    }

    fn metadata_url(&self) -> Result<&str> {
        self.resolve_url(
            "metadataUrl",
            |r| &r.urls.metadata_url,
            |e| &e.api.metadata_url,
        )
    }

    /// Pick a URL from the runtime info, falling back to the enrollment info.
    fn resolve_url(
        &self,
        name: &'static str,
        runtime: impl Fn(&RuntimeInfo) -> &String,
        enrollment: impl Fn(&EnrollmentInfo) -> &String,
    ) -> Result<&str> {
        self.runtime_info
            .as_ref()
            .map(|info| runtime(info).as_str())
            .filter(|url| !url.trim().is_empty())
            .or_else(|| {
                self.enrollment_info
                    .as_ref()
                    .map(|info| enrollment(info).as_str())
                    .filter(|url| !url.trim().is_empty())
            })
            .ok_or(ConnectError::MissingEndpoint(name))
    }

    fn subject(&self) -> DistinguishedName {
        self.enrollment_info
            .as_ref()
            .map(|info| DistinguishedName::parse(&info.certificate.subject))
            .unwrap_or_default()
    }

    fn select_algorithm(&self, hint: &str) -> KeyAlgorithm {
        if let Some(algorithm) = self.config.key_algorithm {
            return algorithm;
        }

        KeyAlgorithm::from_hint(hint).unwrap_or_else(|| {
            let fallback = KeyAlgorithm::default();
            if hint.trim().is_empty() {
                debug!("No key algorithm hint, using {}", fallback);
            } else {
                warn!("Unknown key algorithm '{}', using {}", hint, fallback);
            }
            fallback
        })
    }

    fn write_key_material(&self, key_material: &KeyMaterial) -> Result<()> {
        for (name, data) in key_material_artifacts(key_material) {
            self.write(name, data)?;
        }
        Ok(())
    }

    /// Overwrite the persisted key material. If a write fails, the artifacts
    /// already overwritten get their `previous` content back, so the store
    /// never pairs a new key with an old certificate.
    fn replace_key_material(&self, key_material: &KeyMaterial, previous: &KeyMaterial) -> Result<()> {
        let old = key_material_artifacts(previous);
        let mut written = Vec::new();

        for (name, data) in key_material_artifacts(key_material) {
            if let Err(e) = self.write(name, data) {
                for name in written {
                    let Some((_, data)) = old.iter().find(|(old_name, _)| *old_name == name) else {
                        continue;
                    };
                    if let Err(restore) = self.store.write(name, data) {
                        warn!("Failed to restore '{}': {}", name, restore);
                    }
                }
                return Err(e);
            }
            written.push(name);
        }

        Ok(())
    }

    fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        self.store
            .write(name, data)
            .map_err(|e| ConnectError::storage(name, e))
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.store.read(name).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConnectError::no_persisted_identity(name)
            } else {
                ConnectError::storage(name, e)
            }
        })
    }

    fn read_text(&self, name: &str) -> Result<String> {
        String::from_utf8(self.read(name)?).map_err(|e| {
            ConnectError::storage(
                name,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<T> {
        serde_json::from_slice(&self.read(name)?).map_err(|e| {
            ConnectError::storage(
                name,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })
    }
}

/// Store names and contents of the key material, in write order.
fn key_material_artifacts(key_material: &KeyMaterial) -> Vec<(&'static str, &[u8])> {
    let mut items = vec![
        (artifacts::PRIVATE_KEY, key_material.private_key.as_bytes()),
        (artifacts::CSR, key_material.csr.as_bytes()),
    ];
    if let Some(certificate) = &key_material.certificate {
        items.push((artifacts::CERTIFICATE, certificate.as_bytes()));
    }
    items
}
