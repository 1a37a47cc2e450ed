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

//! Key material persistence.
//!
//! The connector mirrors its state into a [`KeyStore`] under fixed artifact
//! names (see [`artifacts`]). The store holds opaque bytes; encoding and
//! decoding stay with the connector.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

/// Artifact names used by the connector.
pub mod artifacts {
    /// Enrollment info returned by discovery (JSON).
    pub const ENROLLMENT_INFO: &str = "config.json";
    /// Runtime info returned by the info endpoint (JSON).
    pub const RUNTIME_INFO: &str = "info.json";
    /// PEM private key.
    pub const PRIVATE_KEY: &str = "generated.key";
    /// PEM certificate signing request.
    pub const CSR: &str = "generated.csr";
    /// PEM client certificate.
    pub const CERTIFICATE: &str = "generated.crt";
}

/// Named blob storage for key material.
///
/// Reading a name that was never written must fail with
/// [`io::ErrorKind::NotFound`].
pub trait KeyStore {
    /// Store `data` under `name`, replacing any previous content.
    fn write(&self, name: &str, data: &[u8]) -> io::Result<()>;

    /// Read the blob stored under `name`.
    fn read(&self, name: &str) -> io::Result<Vec<u8>>;
}

impl<S: KeyStore + ?Sized> KeyStore for &S {
    fn write(&self, name: &str, data: &[u8]) -> io::Result<()> {
        (**self).write(name, data)
    }

    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        (**self).read(name)
    }
}

impl<S: KeyStore + ?Sized> KeyStore for Arc<S> {
    fn write(&self, name: &str, data: &[u8]) -> io::Result<()> {
        (**self).write(name, data)
    }

    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        (**self).read(name)
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a blob is stored under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        // A poisoned map is still consistent; every write is a single insert.
        self.blobs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyStore for MemoryStore {
    fn write(&self, name: &str, data: &[u8]) -> io::Result<()> {
        self.lock().insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        self.lock().get(name).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} not found", name))
        })
    }
}

/// Directory-backed store: one file per artifact.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&root, fs::Permissions::from_mode(0o700))?;
        }

        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `name`.
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn check_name(name: &str) -> io::Result<()> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid artifact name '{}'", name),
            ));
        }
        Ok(())
    }
}

impl KeyStore for FileStore {
    fn write(&self, name: &str, data: &[u8]) -> io::Result<()> {
        Self::check_name(name)?;
        let path = self.path(name);
        debug!("Writing {}", path.display());

        fs::write(&path, data)?;

        #[cfg(unix)]
        if name == artifacts::PRIVATE_KEY {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        Self::check_name(name)?;
        fs::read(self.path(name))
    }
}
