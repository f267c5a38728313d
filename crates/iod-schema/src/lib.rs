//! Shared types and wire format for IoD package containers.
//!
//! A package container is a single file laid out as:
//!
//! ```text
//! +----------------------+  0
//! | identity (20 bytes)  |  "gpii-iod-package-v1\0"
//! | metadata length  u32 |  little-endian
//! | signature length u32 |  little-endian
//! | installer length u32 |  little-endian
//! +----------------------+  HEADER_LEN
//! | metadata (JSON)      |
//! | signature            |
//! +----------------------+  installer offset
//! | installer payload    |  opaque, optional
//! +----------------------+
//! ```
//!
//! This crate owns the layout and the error taxonomy; reading, writing and
//! signing live in `iod-core`.

pub mod error;
pub mod header;
pub mod metadata;
pub mod response;

// Re-exports
pub use error::{MetadataError, NotFoundError, PackageError, StructuralError, VerificationError};
pub use header::{ContainerHeader, FILE_IDENTITY, HEADER_LEN};
pub use metadata::PackageMetadata;
pub use response::PackageResponse;

/// Conventional file extension for package containers.
pub const PACKAGE_EXTENSION: &str = "morphic-package";
