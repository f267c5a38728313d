use anyhow::{Context, Result, bail};
use iod_core::load_catalog;
use std::path::Path;

/// Print the serving response for a package as JSON.
pub fn info(dir: &Path, name: &str) -> Result<()> {
    let load = load_catalog(dir).context("Failed to load package directory")?;

    let Ok(response) = load.store.response(name) else {
        bail!("Package '{name}' not found");
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
