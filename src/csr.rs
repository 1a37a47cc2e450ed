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

//! CSR (Certificate Signing Request) generation.
//!
//! Every call generates a fresh key pair. The request is a PKCS#10 structure
//! over the parsed subject, returned PEM-encoded together with the PKCS#8
//! private key.

use std::fmt;
use std::str::FromStr;

use rcgen::{CertificateParams, DnType, KeyPair, SignatureAlgorithm};
use rsa::pkcs8::EncodePrivateKey;
use rsa::RsaPrivateKey;

use crate::dn::DistinguishedName;
use crate::error::{ConnectError, Result};

/// Street address attribute (id-at-streetAddress, 2.5.4.9).
const OID_STREET_ADDRESS: [u64; 4] = [2, 5, 4, 9];

/// Key algorithm used for the generated key pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    /// RSA with the given modulus size, signed with SHA-256.
    Rsa {
        /// Modulus size in bits (2048, 3072 or 4096).
        bits: usize,
    },
    /// ECDSA on P-256, signed with SHA-256.
    EcdsaP256,
    /// ECDSA on P-384, signed with SHA-384.
    EcdsaP384,
}

impl Default for KeyAlgorithm {
    fn default() -> Self {
        Self::Rsa { bits: 2048 }
    }
}

impl KeyAlgorithm {
    /// Map the enrollment service's `key-algorithm` hint to an algorithm.
    ///
    /// Returns `None` for an empty or unrecognized hint.
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.trim().to_ascii_lowercase().as_str() {
            "rsa2048" | "rsa-2048" => Some(Self::Rsa { bits: 2048 }),
            "rsa3072" | "rsa-3072" => Some(Self::Rsa { bits: 3072 }),
            "rsa4096" | "rsa-4096" => Some(Self::Rsa { bits: 4096 }),
            "ecdsa-p256" | "p256" | "ec256" => Some(Self::EcdsaP256),
            "ecdsa-p384" | "p384" | "ec384" => Some(Self::EcdsaP384),
            _ => None,
        }
    }

    fn signature_algorithm(&self) -> &'static SignatureAlgorithm {
        match self {
            Self::Rsa { .. } => &rcgen::PKCS_RSA_SHA256,
            Self::EcdsaP256 => &rcgen::PKCS_ECDSA_P256_SHA256,
            Self::EcdsaP384 => &rcgen::PKCS_ECDSA_P384_SHA384,
        }
    }

    /// Generate a new key pair for this algorithm.
    pub fn generate_key_pair(&self) -> Result<KeyPair> {
        match *self {
            Self::Rsa { bits } => {
                if !matches!(bits, 2048 | 3072 | 4096) {
                    return Err(ConnectError::key_generation(format!(
                        "Unsupported RSA key size: {}",
                        bits
                    )));
                }

                let key = RsaPrivateKey::new(&mut rand::thread_rng(), bits).map_err(|e| {
                    ConnectError::key_generation(format!("Failed to generate RSA key: {}", e))
                })?;
                let pkcs8 = key.to_pkcs8_der().map_err(|e| {
                    ConnectError::key_generation(format!("Failed to encode RSA key: {}", e))
                })?;

                KeyPair::try_from(pkcs8.as_bytes()).map_err(|e| {
                    ConnectError::key_generation(format!("Failed to load RSA key: {}", e))
                })
            }
            _ => KeyPair::generate_for(self.signature_algorithm()).map_err(|e| {
                ConnectError::key_generation(format!("Failed to generate key pair: {}", e))
            }),
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rsa { bits } => write!(f, "rsa{}", bits),
            Self::EcdsaP256 => f.write_str("ecdsa-p256"),
            Self::EcdsaP384 => f.write_str("ecdsa-p384"),
        }
    }
}

impl FromStr for KeyAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_hint(s).ok_or_else(|| {
            format!(
                "unknown key algorithm '{}' (expected rsa2048, rsa3072, rsa4096, ecdsa-p256 or ecdsa-p384)",
                s
            )
        })
    }
}

/// A freshly generated signing request and its private key.
#[derive(Clone)]
pub struct GeneratedCsr {
    /// PEM-encoded PKCS#10 request (`CERTIFICATE REQUEST`).
    pub csr_pem: String,
    /// PEM-encoded PKCS#8 private key (`PRIVATE KEY`).
    pub private_key_pem: String,
}

impl fmt::Debug for GeneratedCsr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedCsr")
            .field("csr_pem", &self.csr_pem)
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}

/// Builder for creating Certificate Signing Requests.
///
/// # Example
///
/// ```no_run
/// use kyma_connector::csr::{CsrBuilder, KeyAlgorithm};
///
/// let generated = CsrBuilder::new()
///     .common_name("my-app")
///     .organization("Example Corp")
///     .country("DE")
///     .key_algorithm(KeyAlgorithm::EcdsaP256)
///     .build()
///     .expect("Failed to generate CSR");
/// ```
pub struct CsrBuilder {
    params: CertificateParams,
    algorithm: KeyAlgorithm,
    has_common_name: bool,
}

impl Default for CsrBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsrBuilder {
    /// Create a new CSR builder with an empty subject and RSA-2048.
    pub fn new() -> Self {
        Self {
            params: CertificateParams::default(),
            algorithm: KeyAlgorithm::default(),
            has_common_name: false,
        }
    }

    /// Create a builder whose subject carries every field set on `dn`.
    pub fn from_dn(dn: &DistinguishedName) -> Self {
        let mut builder = Self::new();

        if let Some(o) = &dn.organization {
            builder = builder.organization(o);
        }
        if let Some(ou) = &dn.organizational_unit {
            builder = builder.organizational_unit(ou);
        }
        if let Some(l) = &dn.locality {
            builder = builder.locality(l);
        }
        if let Some(st) = &dn.province {
            builder = builder.state(st);
        }
        if let Some(street) = &dn.street {
            builder = builder.street(street);
        }
        if let Some(c) = &dn.country {
            builder = builder.country(c);
        }
        if let Some(cn) = &dn.common_name {
            builder = builder.common_name(cn);
        }

        builder
    }

    /// Set the Common Name (CN) for the subject.
    pub fn common_name(mut self, cn: impl Into<String>) -> Self {
        self.params
            .distinguished_name
            .push(DnType::CommonName, cn.into());
        self.has_common_name = true;
        self
    }

    /// Set the Organization (O) for the subject.
    pub fn organization(mut self, org: impl Into<String>) -> Self {
        self.params
            .distinguished_name
            .push(DnType::OrganizationName, org.into());
        self
    }

    /// Set the Organizational Unit (OU) for the subject.
    pub fn organizational_unit(mut self, ou: impl Into<String>) -> Self {
        self.params
            .distinguished_name
            .push(DnType::OrganizationalUnitName, ou.into());
        self
    }

    /// Set the Country (C) for the subject.
    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.params
            .distinguished_name
            .push(DnType::CountryName, country.into());
        self
    }

    /// Set the State/Province (ST) for the subject.
    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.params
            .distinguished_name
            .push(DnType::StateOrProvinceName, state.into());
        self
    }

    /// Set the Street Address (STREET) for the subject.
    pub fn street(mut self, street: impl Into<String>) -> Self {
        self.params.distinguished_name.push(
            DnType::CustomDnType(OID_STREET_ADDRESS.to_vec()),
            street.into(),
        );
        self
    }

    /// Set the Locality (L) for the subject.
    pub fn locality(mut self, locality: impl Into<String>) -> Self {
        self.params
            .distinguished_name
            .push(DnType::LocalityName, locality.into());
        self
    }

    /// Select the key algorithm.
    pub fn key_algorithm(mut self, algorithm: KeyAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Generate a fresh key pair and build the CSR.
    pub fn build(self) -> Result<GeneratedCsr> {
        if !self.has_common_name {
            return Err(ConnectError::request_encoding(
                "Subject has no common name (CN)",
            ));
        }

        let key_pair = self.algorithm.generate_key_pair()?;

        let csr = self
            .params
            .serialize_request(&key_pair)
            .map_err(|e| ConnectError::request_encoding(format!("Failed to serialize CSR: {}", e)))?;

        let csr_pem = csr
            .pem()
            .map_err(|e| ConnectError::request_encoding(format!("Failed to encode CSR: {}", e)))?;

        Ok(GeneratedCsr {
            csr_pem,
            private_key_pem: key_pair.serialize_pem(),
        })
    }
}

/// Generate a key pair and a CSR for the given subject.
pub fn generate(dn: &DistinguishedName, algorithm: KeyAlgorithm) -> Result<GeneratedCsr> {
    CsrBuilder::from_dn(dn).key_algorithm(algorithm).build()
}
