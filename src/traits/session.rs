//! Session lifecycle for data providers.

use crate::VfsError;

/// Release of backend session resources.
pub trait ProviderSession: Send + Sync {
    /// Release the session.
    ///
    /// Must succeed for backends that hold nothing to release, and must be
    /// safe to call more than once. What later calls do is backend-defined,
    /// but they must not corrupt remote state.
    fn close(&self) -> Result<(), VfsError>;
}
