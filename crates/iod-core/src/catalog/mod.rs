//! Directory-backed package catalog.
//!
//! [`load_catalog`] walks a directory tree and decodes every file it finds.
//! Files that fail to decode or verify are reported as [`LoadFailure`]s and
//! skipped; the scan itself only fails when the root cannot be opened.
//!
//! The resulting [`CatalogStore`] is immutable. [`Catalog`] holds the current
//! store behind a lock and swaps in a freshly built one on reload, so a reader
//! either sees the old index or the new one, never a mixture.

mod loader;
mod store;

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use iod_schema::PackageError;
use thiserror::Error;

pub use loader::load_catalog;
pub use store::CatalogStore;

/// The catalog root could not be opened.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Cannot open package directory {}: {source}", path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A file that was skipped during a load.
#[derive(Debug)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub error: PackageError,
}

impl std::fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}

/// Outcome of one pass over the package directory.
#[derive(Debug)]
pub struct CatalogLoad {
    pub store: CatalogStore,
    pub failures: Vec<LoadFailure>,
}

/// Shared handle to the current catalog for one package directory.
///
/// Cheap to share behind an [`Arc`]. Readers take a [`snapshot`](Self::snapshot)
/// and keep using it for as long as they like; [`reload`](Self::reload)
/// replaces the store wholesale without disturbing them.
#[derive(Debug)]
pub struct Catalog {
    root: PathBuf,
    current: RwLock<Arc<CatalogStore>>,
}

impl Catalog {
    /// Load `root` and wrap the result.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` cannot be opened.
    pub fn open(root: impl Into<PathBuf>) -> Result<(Self, Vec<LoadFailure>), CatalogError> {
        let root = root.into();
        let CatalogLoad { store, failures } = load_catalog(&root)?;
        let catalog = Self {
            root,
            current: RwLock::new(Arc::new(store)),
        };
        Ok((catalog, failures))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The store as of the last completed load.
    pub fn snapshot(&self) -> Arc<CatalogStore> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rebuild the store from disk and swap it in.
    ///
    /// The new store is built without holding the lock. If the root cannot
    /// be opened the current store is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be opened.
    pub fn reload(&self) -> Result<Vec<LoadFailure>, CatalogError> {
        let CatalogLoad { store, failures } = load_catalog(&self.root)?;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(store);
        Ok(failures)
    }
}
