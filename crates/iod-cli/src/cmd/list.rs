use anyhow::{Context, Result};
use comfy_table::Table;
use iod_core::load_catalog;
use std::path::Path;

use crate::format_size;

/// List every package in `dir`, then every file that failed to load.
///
/// Skipped files are reported but are not an error; only an unreadable
/// directory is.
pub fn list(dir: &Path) -> Result<()> {
    let load = load_catalog(dir).context("Failed to load package directory")?;

    if load.store.is_empty() {
        println!();
        println!("  No packages in {}.", dir.display());
    } else {
        let mut table = Table::new();
        table.set_header(vec!["Name", "Version", "Installer", "Size"]);
        for entry in load.store.entries() {
            let size = if entry.has_installer() {
                format_size(u64::from(entry.header.installer_len))
            } else {
                "-".to_string()
            };
            table.add_row(vec![
                entry.name().to_string(),
                entry.metadata.version().unwrap_or("-").to_string(),
                entry.metadata.installer().unwrap_or("-").to_string(),
                size,
            ]);
        }
        println!("{table}");
        println!("  {} packages", load.store.len());
    }

    if !load.failures.is_empty() {
        eprintln!();
        eprintln!("  skipped {} files:", load.failures.len());
        for failure in &load.failures {
            eprintln!("  {failure}");
        }
    }

    Ok(())
}
