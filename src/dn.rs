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

//! Distinguished name parsing.
//!
//! The enrollment service hands out the certificate subject as a flat string
//! of comma-separated `KEY=VALUE` tokens using PKIX short names:
//!
//! ```text
//! O=Organization,OU=OrgUnit,L=Waldorf,ST=Waldorf,C=DE,CN=my-app
//! ```

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Structured certificate subject.
///
/// Every field is optional. The common name identifies the enrolling
/// application and is required once the name is turned into a CSR.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    /// Organization (`O`).
    pub organization: Option<String>,
    /// Organizational unit (`OU`).
    pub organizational_unit: Option<String>,
    /// Locality (`L`).
    pub locality: Option<String>,
    /// State or province (`ST`).
    pub province: Option<String>,
    /// Street address (`STREET`).
    pub street: Option<String>,
    /// Country (`C`).
    pub country: Option<String>,
    /// Common name (`CN`).
    pub common_name: Option<String>,
}

impl DistinguishedName {
    /// Parse a subject string.
    ///
    /// Keys are matched case-insensitively. Tokens without `=` and keys other
    /// than `O`, `OU`, `L`, `ST`, `STREET`, `C` and `CN` are ignored. When a key
    /// appears more than once the last occurrence wins, and an empty value
    /// clears the field.
    pub fn parse(subject: &str) -> Self {
        let mut dn = Self::default();

        for token in subject.split(',') {
            let Some((key, value)) = token.split_once('=') else {
                continue;
            };

            let slot = match key.trim().to_ascii_uppercase().as_str() {
                "O" => &mut dn.organization,
                "OU" => &mut dn.organizational_unit,
                "L" => &mut dn.locality,
                "ST" => &mut dn.province,
                "STREET" => &mut dn.street,
                "C" => &mut dn.country,
                "CN" => &mut dn.common_name,
                _ => continue,
            };

            let value = value.trim();
            *slot = if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            };
        }

        dn
    }

    /// Get the common name, if set.
    pub fn common_name(&self) -> Option<&str> {
        self.common_name.as_deref()
    }

    /// Returns true if no field is set.
    pub fn is_empty(&self) -> bool {
        self.fields().next().is_none()
    }

    /// Iterate over the set fields as `(short name, value)` pairs.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("O", &self.organization),
            ("OU", &self.organizational_unit),
            ("L", &self.locality),
            ("ST", &self.province),
            ("STREET", &self.street),
            ("C", &self.country),
            ("CN", &self.common_name),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
    }
}

impl FromStr for DistinguishedName {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.fields().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}
