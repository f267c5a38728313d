//! Serving-layer view of a catalog entry.

use serde::{Deserialize, Serialize};

/// What the serving layer hands to clients for one package.
///
/// Clients re-verify `package_data` against `package_data_signature`
/// themselves, so the metadata is passed through as the exact signed string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageResponse {
    /// The metadata JSON exactly as stored in the container.
    pub package_data: String,
    /// Base64 of the raw signature bytes.
    pub package_data_signature: String,
    /// Path of the installer resource, when the package has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installer: Option<String>,
}

impl PackageResponse {
    /// Installer route for a package name.
    pub fn installer_route(name: &str) -> String {
        format!("/installer/{name}")
    }
}
