use std::collections::BTreeMap;

use iod_schema::{NotFoundError, PackageError, PackageResponse};

use crate::container::CatalogEntry;
use crate::installer::InstallerStream;

/// Verified packages keyed by name.
#[derive(Debug, Clone, Default)]
pub struct CatalogStore {
    packages: BTreeMap<String, CatalogEntry>,
}

impl CatalogStore {
    /// Index `entry` under its name, returning whatever it replaced.
    pub(crate) fn insert(&mut self, entry: CatalogEntry) -> Option<CatalogEntry> {
        self.packages.insert(entry.name().to_string(), entry)
    }

    /// Entry for `name`, if loaded.
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.packages.get(name)
    }

    /// Whether a package called `name` is loaded.
    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// Number of loaded packages.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether no packages are loaded.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Package names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }

    /// Loaded entries in name order.
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.packages.values()
    }

    /// Serving view of a package.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError::Package`] for an unknown name.
    pub fn response(&self, name: &str) -> Result<PackageResponse, NotFoundError> {
        self.get(name)
            .map(CatalogEntry::response)
            .ok_or_else(|| NotFoundError::Package(name.to_string()))
    }

    /// Stream a package's installer payload straight from its container file.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError`] for an unknown name or a package without an
    /// installer, or an IO error if the container cannot be opened.
    pub async fn stream_installer(&self, name: &str) -> Result<InstallerStream, PackageError> {
        let entry = self
            .get(name)
            .ok_or_else(|| NotFoundError::Package(name.to_string()))?;
        entry.installer_stream().await
    }
}
