//! Error taxonomy shared by every backend.

use std::io;

use crate::VfsPath;

/// A boxed backend-native failure, kept as the nested cause of a [`VfsError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure categories that cross the provider boundary.
///
/// Backends translate their native failures into one of these variants;
/// the native error only survives as the `source`.
///
/// # Examples
///
/// ```rust
/// use vfs_contract::{VfsError, VfsPath};
///
/// let err = VfsError::not_found(VfsPath::new("/missing"));
/// assert_eq!(err.to_string(), "not found: /missing");
/// assert!(err.is_not_found());
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum VfsError {
    /// The path does not exist where existence was required.
    #[error("not found: {path}")]
    NotFound {
        /// The path that was not found.
        path: VfsPath,
        /// Backend-native cause, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// The attribute shape is not one the backend recognizes.
    #[error("unsupported attributes: {shape}")]
    UnsupportedAttributes {
        /// Type name of the rejected destination or source.
        shape: &'static str,
    },

    /// The shape was recognized but the backend cannot perform the operation.
    #[error("{operation}: unsupported operation: {path}")]
    UnsupportedOperation {
        /// The unsupported operation.
        operation: &'static str,
        /// The path the operation was attempted on.
        path: VfsPath,
    },

    /// The backend rejected the operation on authorization or naming grounds.
    #[error("{operation}: permission denied: {path}")]
    PermissionDenied {
        /// The path where permission was denied.
        path: VfsPath,
        /// The operation that was denied.
        operation: &'static str,
        /// Backend-native cause, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// Any other backend failure.
    #[error("{operation} failed for {path}: {source}")]
    Backend {
        /// The operation that failed.
        operation: &'static str,
        /// The path involved in the operation.
        path: VfsPath,
        /// The backend-native error.
        #[source]
        source: BoxError,
    },
}

impl VfsError {
    /// A [`VfsError::NotFound`] without a nested cause.
    pub fn not_found(path: VfsPath) -> Self {
        Self::NotFound { path, source: None }
    }

    /// A [`VfsError::PermissionDenied`] without a nested cause.
    pub fn permission_denied(path: VfsPath, operation: &'static str) -> Self {
        Self::PermissionDenied {
            path,
            operation,
            source: None,
        }
    }

    /// A [`VfsError::UnsupportedOperation`].
    pub fn unsupported_operation(operation: &'static str, path: VfsPath) -> Self {
        Self::UnsupportedOperation { operation, path }
    }

    /// Wrap a backend-native error.
    pub fn backend(operation: &'static str, path: VfsPath, source: impl Into<BoxError>) -> Self {
        Self::Backend {
            operation,
            path,
            source: source.into(),
        }
    }

    /// Translate an I/O error, mapping well-known kinds onto the taxonomy.
    pub fn io(operation: &'static str, path: VfsPath, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound {
                path,
                source: Some(error.into()),
            },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                path,
                operation,
                source: Some(error.into()),
            },
            io::ErrorKind::Unsupported => Self::UnsupportedOperation { operation, path },
            _ => Self::backend(operation, path, error),
        }
    }

    /// Returns `true` for [`VfsError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` for [`VfsError::PermissionDenied`].
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }

    /// Returns `true` for [`VfsError::UnsupportedOperation`].
    pub fn is_unsupported_operation(&self) -> bool {
        matches!(self, Self::UnsupportedOperation { .. })
    }

    /// The rejected shape name if this is [`VfsError::UnsupportedAttributes`].
    pub fn unsupported_attributes(&self) -> Option<&'static str> {
        match self {
            Self::UnsupportedAttributes { shape } => Some(shape),
            _ => None,
        }
    }
}
