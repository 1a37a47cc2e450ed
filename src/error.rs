//! Error types for the connector.
//!
//! Every failure is surfaced to the immediate caller with the operation and the
//! offending URL, field or artifact name. Nothing in this crate retries.

use thiserror::Error;

/// Result type alias using [`ConnectError`].
pub type Result<T> = std::result::Result<T, ConnectError>;

/// Errors that can occur while enrolling or using the connector identity.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The configuration URL could not be queried or returned unusable data.
    #[error("Discovery failed for {url}: {reason}")]
    DiscoveryFailed {
        /// Configuration URL that was queried.
        url: String,
        /// What went wrong.
        reason: String,
        /// Raw response body, when one was received.
        body: Option<String>,
    },

    /// A fresh key pair could not be generated.
    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    /// The signing request could not be built or encoded.
    #[error("Request encoding failed: {0}")]
    RequestEncodingFailed(String),

    /// The signing (or renewal) endpoint refused the request or answered with
    /// an unusable body.
    #[error("Signing failed at {url}: {message}")]
    SigningFailed {
        /// Endpoint the CSR was posted to.
        url: String,
        /// HTTP status code, if the server answered.
        status: Option<u16>,
        /// Server message or parse error.
        message: String,
    },

    /// The returned certificate payload was not valid base64 / UTF-8 PEM.
    #[error("Certificate decode failed: {0}")]
    CertificateDecodeFailed(String),

    /// Private key and certificate are malformed or do not form a pair.
    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// The HTTP client could not be configured (trust anchors, headers).
    #[error("TLS configuration failed: {0}")]
    TlsConfigFailed(String),

    /// A required endpoint URL is absent or empty.
    #[error("Missing endpoint: {0}")]
    MissingEndpoint(&'static str),

    /// A persisted artifact needed to resume is not in the store.
    #[error("No persisted identity: artifact '{artifact}' not found")]
    NoPersistedIdentity {
        /// Store name of the missing artifact.
        artifact: String,
    },

    /// The key-material store failed to read or write a blob.
    #[error("Storage failed for '{name}': {source}")]
    StorageFailed {
        /// Store name of the artifact.
        name: String,
        /// Underlying store error.
        #[source]
        source: std::io::Error,
    },

    /// Network or TLS failure before a response was received.
    #[error("Transport failed during {operation}: {source}")]
    TransportFailed {
        /// Operation that was running.
        operation: &'static str,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The operation needs an enrolled identity and there is none.
    #[error("Not enrolled: {operation} requires an enrolled identity")]
    NotEnrolled {
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// A management endpoint answered with a non-success status.
    #[error("Server error during {operation} ({status}): {message}")]
    ServerError {
        /// Operation that was running.
        operation: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },
}

impl ConnectError {
    /// Create a discovery error without a response body.
    pub fn discovery(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DiscoveryFailed {
            url: url.into(),
            reason: reason.into(),
            body: None,
        }
    }

    /// Create a discovery error that keeps the raw response body.
    pub fn discovery_with_body(
        url: impl Into<String>,
        reason: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::DiscoveryFailed {
            url: url.into(),
            reason: reason.into(),
            body: Some(body.into()),
        }
    }

    /// Create a key generation error.
    pub fn key_generation(msg: impl Into<String>) -> Self {
        Self::KeyGenerationFailed(msg.into())
    }

    /// Create a request encoding error.
    pub fn request_encoding(msg: impl Into<String>) -> Self {
        Self::RequestEncodingFailed(msg.into())
    }

    /// Create a signing error.
    pub fn signing(url: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::SigningFailed {
            url: url.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a certificate decode error.
    pub fn certificate_decode(msg: impl Into<String>) -> Self {
        Self::CertificateDecodeFailed(msg.into())
    }

    /// Create an invalid key material error.
    pub fn invalid_key_material(msg: impl Into<String>) -> Self {
        Self::InvalidKeyMaterial(msg.into())
    }

    /// Create a TLS configuration error.
    pub fn tls_config(msg: impl Into<String>) -> Self {
        Self::TlsConfigFailed(msg.into())
    }

    /// Create a missing persisted identity error.
    pub fn no_persisted_identity(artifact: impl Into<String>) -> Self {
        Self::NoPersistedIdentity {
            artifact: artifact.into(),
        }
    }

    /// Wrap a store failure for the named artifact.
    pub fn storage(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::StorageFailed {
            name: name.into(),
            source,
        }
    }

    /// Wrap an HTTP client failure.
    pub fn transport(operation: &'static str, source: reqwest::Error) -> Self {
        Self::TransportFailed { operation, source }
    }

    /// Create a server error with status and message.
    pub fn server_error(operation: &'static str, status: u16, message: impl Into<String>) -> Self {
        Self::ServerError {
            operation,
            status,
            message: message.into(),
        }
    }

    /// Returns true if repeating the whole operation later may succeed.
    ///
    /// The connector never acts on this itself.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::TransportFailed { .. } => true,
            Self::StorageFailed { source, .. } => matches!(
                source.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
            ),
            Self::SigningFailed {
                status: Some(status),
                ..
            } => *status >= 500,
            Self::ServerError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
