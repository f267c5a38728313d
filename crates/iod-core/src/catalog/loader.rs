use std::fs;
use std::path::Path;

use iod_schema::PackageError;
use walkdir::WalkDir;

use super::{CatalogError, CatalogLoad, CatalogStore, LoadFailure};
use crate::container;

/// Decode and verify every file under `root`.
///
/// Traversal is depth-first in file-name order, so identical trees give
/// identical results. Symlinks are followed, so a linked directory is
/// scanned like any other; a link back into its own ancestry is reported as a
/// failure for that path. Later files win when two packages share a name.
///
/// # Errors
///
/// Returns an error only if `root` itself cannot be read. Everything below
/// it is reported through [`CatalogLoad::failures`].
pub fn load_catalog(root: &Path) -> Result<CatalogLoad, CatalogError> {
    fs::read_dir(root).map_err(|source| CatalogError::Root {
        path: root.to_path_buf(),
        source,
    })?;

    let mut store = CatalogStore::default();
    let mut failures = Vec::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .map_or_else(|| root.to_path_buf(), Path::to_path_buf);
                tracing::warn!("skipping {}: {e}", path.display());
                let error = PackageError::Io(e.into());
                failures.push(LoadFailure { path, error });
                continue;
            }
        };

        if entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path();
        match container::read_container(path) {
            Ok(package) => {
                tracing::debug!("loaded package {} from {}", package.name(), path.display());
                if let Some(previous) = store.insert(package) {
                    tracing::warn!(
                        "package {} in {} replaces the one in {}",
                        previous.name(),
                        path.display(),
                        previous.path.display()
                    );
                }
            }
            Err(error) => {
                tracing::warn!(
                    "skipping {} ({} error): {error}",
                    path.display(),
                    error.category()
                );
                failures.push(LoadFailure {
                    path: path.to_path_buf(),
                    error,
                });
            }
        }
    }

    tracing::info!(
        "loaded {} packages from {} ({} skipped)",
        store.len(),
        root.display(),
        failures.len()
    );

    Ok(CatalogLoad { store, failures })
}
