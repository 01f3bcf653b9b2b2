//! # Attribute Exchange
//!
//! Type-erased metadata exchange with capability negotiation.
//!
//! ## Overview
//!
//! Callers hand a backend a destination ([`AttrsMut`]) or source
//! ([`AttrsRef`]) of any shape. The backend declares which [`AttrKind`]s it
//! supports and calls `negotiate`; a recognized and supported shape comes
//! back as a variant of a closed enum, anything else becomes
//! [`VfsError::UnsupportedAttributes`].
//!
//! ```rust
//! use vfs_contract::{AttrKind, AttrsMut, AttrsTarget, ResourceInfo};
//!
//! let mut info = ResourceInfo::default();
//! match AttrsMut::new(&mut info).negotiate(&[AttrKind::ResourceInfo]) {
//!     Ok(AttrsTarget::ResourceInfo(dest)) => dest.size = 42,
//!     Ok(_) => unreachable!("only ResourceInfo was offered"),
//!     Err(e) => panic!("{e}"),
//! }
//! assert_eq!(info.size, 42);
//!
//! let mut text = String::from("hello world");
//! let err = AttrsMut::new(&mut text)
//!     .negotiate(&[AttrKind::ResourceInfo])
//!     .unwrap_err();
//! assert!(err.unsupported_attributes().is_some());
//! ```

use std::any::{Any, TypeId, type_name};
use std::fmt;

use crate::{ResourceInfo, VfsError};

/// Attribute shapes a backend can declare support for.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrKind {
    /// [`ResourceInfo`].
    ResourceInfo,
}

impl AttrKind {
    fn of(id: TypeId) -> Option<Self> {
        if id == TypeId::of::<ResourceInfo>() {
            Some(Self::ResourceInfo)
        } else {
            None
        }
    }
}

/// A negotiated read destination.
#[non_exhaustive]
#[derive(Debug)]
pub enum AttrsTarget<'a> {
    /// Fill in basic metadata.
    ResourceInfo(&'a mut ResourceInfo),
}

/// A negotiated write source.
#[non_exhaustive]
#[derive(Debug)]
pub enum AttrsSource<'a> {
    /// Apply basic metadata.
    ResourceInfo(&'a ResourceInfo),
}

/// Destination of a read-attributes call.
pub struct AttrsMut<'a> {
    value: &'a mut dyn Any,
    shape: &'static str,
}

impl<'a> AttrsMut<'a> {
    /// Wrap any value as a destination.
    pub fn new<T: Any>(dest: &'a mut T) -> Self {
        Self {
            value: dest,
            shape: type_name::<T>(),
        }
    }

    /// Type name of the wrapped value.
    pub fn shape(&self) -> &'static str {
        self.shape
    }

    /// The recognized kind of the wrapped value, if any.
    pub fn kind(&self) -> Option<AttrKind> {
        AttrKind::of((*self.value).type_id())
    }

    /// Resolve the destination against the kinds a backend supports.
    ///
    /// # Errors
    ///
    /// [`VfsError::UnsupportedAttributes`] if the shape is unknown or not in `supported`.
    pub fn negotiate(self, supported: &[AttrKind]) -> Result<AttrsTarget<'a>, VfsError> {
        let shape = self.shape;
        let unsupported = || VfsError::UnsupportedAttributes { shape };
        match self.kind() {
            Some(AttrKind::ResourceInfo) if supported.contains(&AttrKind::ResourceInfo) => self
                .value
                .downcast_mut::<ResourceInfo>()
                .map(AttrsTarget::ResourceInfo)
                .ok_or_else(unsupported),
            _ => Err(unsupported()),
        }
    }
}

impl fmt::Debug for AttrsMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttrsMut").field("shape", &self.shape).finish()
    }
}

/// Source of a write-attributes call.
#[derive(Clone, Copy)]
pub struct AttrsRef<'a> {
    value: &'a dyn Any,
    shape: &'static str,
}

impl<'a> AttrsRef<'a> {
    /// Wrap any value as a source.
    pub fn new<T: Any>(src: &'a T) -> Self {
        Self {
            value: src,
            shape: type_name::<T>(),
        }
    }

    /// Type name of the wrapped value.
    pub fn shape(&self) -> &'static str {
        self.shape
    }

    /// The recognized kind of the wrapped value, if any.
    pub fn kind(&self) -> Option<AttrKind> {
        AttrKind::of((*self.value).type_id())
    }

    /// Resolve the source against the kinds a backend supports.
    ///
    /// # Errors
    ///
    /// [`VfsError::UnsupportedAttributes`] if the shape is unknown or not in `supported`.
    pub fn negotiate(self, supported: &[AttrKind]) -> Result<AttrsSource<'a>, VfsError> {
        let unsupported = || VfsError::UnsupportedAttributes { shape: self.shape };
        match self.kind() {
            Some(AttrKind::ResourceInfo) if supported.contains(&AttrKind::ResourceInfo) => self
                .value
                .downcast_ref::<ResourceInfo>()
                .map(AttrsSource::ResourceInfo)
                .ok_or_else(unsupported),
            _ => Err(unsupported()),
        }
    }
}

impl fmt::Debug for AttrsRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttrsRef").field("shape", &self.shape).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    struct Opaque {
        hidden: String,
    }

    #[test]
    fn resource_info_is_recognized() {
        let mut info = ResourceInfo::default();
        let dest = AttrsMut::new(&mut info);
        assert_eq!(dest.kind(), Some(AttrKind::ResourceInfo));
        let Ok(AttrsTarget::ResourceInfo(target)) = dest.negotiate(&[AttrKind::ResourceInfo])
        else {
            panic!("expected ResourceInfo target");
        };
        target.name = "x".into();
        assert_eq!(info.name, "x");
    }

    #[test]
    fn opaque_struct_is_rejected() {
        let mut opaque = Opaque {
            hidden: String::new(),
        };
        let dest = AttrsMut::new(&mut opaque);
        assert_eq!(dest.kind(), None);
        let err = dest.negotiate(&[AttrKind::ResourceInfo]).unwrap_err();
        assert!(err.unsupported_attributes().unwrap().ends_with("Opaque"));
    }

    #[test]
    fn value_types_are_rejected() {
        let mut s = "hello world";
        let err = AttrsMut::new(&mut s)
            .negotiate(&[AttrKind::ResourceInfo])
            .unwrap_err();
        assert_eq!(err.unsupported_attributes(), Some("&str"));

        let mut n = 7_u32;
        assert!(AttrsMut::new(&mut n).negotiate(&[AttrKind::ResourceInfo]).is_err());
    }

    #[test]
    fn undeclared_kind_is_rejected() {
        let mut info = ResourceInfo::default();
        let err = AttrsMut::new(&mut info).negotiate(&[]).unwrap_err();
        assert!(err.unsupported_attributes().is_some());
    }

    #[test]
    fn write_source_negotiation() {
        let info = ResourceInfo {
            mod_time: 5,
            ..Default::default()
        };
        let Ok(AttrsSource::ResourceInfo(src)) =
            AttrsRef::new(&info).negotiate(&[AttrKind::ResourceInfo])
        else {
            panic!("expected ResourceInfo source");
        };
        assert_eq!(src.mod_time, 5);

        let opaque = Opaque {
            hidden: String::new(),
        };
        let err = AttrsRef::new(&opaque)
            .negotiate(&[AttrKind::ResourceInfo])
            .unwrap_err();
        assert!(err.unsupported_attributes().is_some());
    }
}
