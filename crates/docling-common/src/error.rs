//! Error types for the docling operator
//!
//! Errors carry the kind and name of the object involved so a failed
//! reconciliation can be traced back to the resource that caused it.

use thiserror::Error;

/// Main error type for docling operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// A dependent resource does not exist (yet)
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        /// Resource kind (e.g., "Deployment")
        kind: String,
        /// Namespace that was searched
        namespace: String,
        /// Name that was looked up
        name: String,
    },

    /// A dependent resource exists but lacks a field the status is derived from
    #[error("{kind} {name} is missing {field}")]
    MissingField {
        /// Resource kind (e.g., "Deployment")
        kind: String,
        /// Name of the resource
        name: String,
        /// Path of the missing field (e.g., "spec.template.spec.containers[0]")
        field: String,
    },

    /// Optimistic-concurrency conflict: the object changed since it was read
    #[error("conflict updating {kind} {name}")]
    Conflict {
        /// Resource kind being written
        kind: String,
        /// Name of the resource
        name: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },
}

impl Error {
    /// Create a not-found error for a namespaced resource
    pub fn not_found(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Create a missing-field error
    pub fn missing_field(
        kind: impl Into<String>,
        name: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self::MissingField {
            kind: kind.into(),
            name: name.into(),
            field: field.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Conflict {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Whether this error is an optimistic-concurrency conflict
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Conflict { .. } => true,
            Error::Kube {
                source: kube::Error::Api(ae),
            } => ae.code == 409,
            _ => false,
        }
    }

    /// Whether this error is a missing resource
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Kube {
                source: kube::Error::Api(ae),
            } => ae.code == 404,
            _ => false,
        }
    }

    /// Whether this error is expected to clear up without anyone acting on it.
    ///
    /// Missing dependents, conflicts, throttling and server-side failures
    /// settle once the other controllers or the API server catch up. Client
    /// errors such as a 403 and serialization failures point at RBAC or code
    /// that someone has to fix. Every error is retried either way; this only
    /// picks how loudly it is reported.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Kube { source } => match source {
                kube::Error::Api(ae) => {
                    !(400..500).contains(&ae.code) || matches!(ae.code, 404 | 409 | 429)
                }
                _ => true,
            },
            Error::NotFound { .. } => true,
            Error::MissingField { .. } => true,
            Error::Conflict { .. } => true,
            Error::Serialization { .. } => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::serialization(e.to_string())
    }
}
