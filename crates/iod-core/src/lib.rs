//! Building, verifying and serving IoD package containers.
//!
//! [`write_container`] signs metadata and packs it with an optional
//! installer; [`load_catalog`] scans a directory tree, verifies every
//! container it finds and indexes the good ones by name.

pub mod armor;
pub mod catalog;
pub mod config;
pub mod container;
pub mod hashing;
pub mod installer;
pub mod keys;
pub mod signing;

pub use catalog::{Catalog, CatalogError, CatalogLoad, CatalogStore, LoadFailure, load_catalog};
pub use config::IodConfig;
pub use container::{
    CatalogEntry, PreparedContainer, create_container, decode_bytes, decode_container,
    prepare_container, read_container, reconcile_installer, write_container,
};
pub use installer::InstallerStream;
pub use keys::{KeyError, SigningKeyPair};
pub use signing::{is_authentic, sign_metadata, verify_metadata};

// Re-export the wire types so callers need only one dependency.
pub use iod_schema::{
    ContainerHeader, MetadataError, NotFoundError, PackageError, PackageMetadata, PackageResponse,
    StructuralError, VerificationError,
};
