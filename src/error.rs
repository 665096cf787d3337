//! # Errors
//!
//! Error types shared by the store facade, the secret manager and the backends.
//!
//! Backend failures travel through the facade unchanged: [`Error::Backend`] is
//! transparent, so callers see the same message and can match on the original
//! [`BackendError`] variant.

use std::fmt;
use thiserror::Error;

/// Kind of backend object an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Namespace,
    Secret,
}

impl ResourceKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Namespace => "namespace",
            ResourceKind::Secret => "secret",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported by secret and namespace backends
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{kind} {key} not found")]
    NotFound { kind: ResourceKind, key: String },

    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: ResourceKind, key: String },

    #[error("conflict writing {kind} {key}: {message}")]
    Conflict {
        kind: ResourceKind,
        key: String,
        message: String,
    },

    #[error(transparent)]
    Kube(#[from] kube::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BackendError {
    /// Classify a Kubernetes API error for the given object
    ///
    /// 404 maps to `NotFound`, 409 with reason `AlreadyExists` to `AlreadyExists`,
    /// any other 409 to `Conflict`. Everything else is kept as the raw client error.
    pub fn from_kube(err: kube::Error, kind: ResourceKind, key: impl Into<String>) -> Self {
        match err {
            kube::Error::Api(ref response) if response.code == 404 => BackendError::NotFound {
                kind,
                key: key.into(),
            },
            kube::Error::Api(ref response)
                if response.code == 409 && response.reason == "AlreadyExists" =>
            {
                BackendError::AlreadyExists {
                    kind,
                    key: key.into(),
                }
            }
            kube::Error::Api(response) if response.code == 409 => BackendError::Conflict {
                kind,
                key: key.into(),
                message: response.message,
            },
            other => BackendError::Kube(other),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound { .. })
    }

    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, BackendError::AlreadyExists { .. })
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, BackendError::Conflict { .. })
    }
}

/// Errors returned by the store capability set
#[derive(Debug, Error)]
pub enum Error {
    #[error("no store registered for resource type '{0}'")]
    UnknownResourceType(String),

    #[error("no schema registered for resource type '{0}'")]
    UnknownSchema(String),

    #[error("schema of '{type_name}' recurses through field '{field}' and holds password fields")]
    RecursiveSchema { type_name: String, field: String },

    #[error("{resource_type} '{id}' not found")]
    ResourceNotFound { resource_type: String, id: String },

    #[error("secret {namespace}/{name} has no data key '{name}'")]
    MissingSecretKey { namespace: String, name: String },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Delegate(anyhow::Error),
}

impl Error {
    /// Underlying backend error, if this error came from a backend
    #[must_use]
    pub fn backend(&self) -> Option<&BackendError> {
        match self {
            Error::Backend(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
