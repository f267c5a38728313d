//! Inspect command

use anyhow::{Context, Result, bail};
use iod_core::decode_container;
use std::path::Path;

use crate::format_size;

/// Decode one container, print its layout and metadata, and verify it.
pub fn inspect(file: &Path) -> Result<()> {
    let mut entry = decode_container(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let verification = entry.verify();

    let h = entry.header;
    let lw = 18;
    println!();
    println!("  {}", entry.name());
    println!();
    println!("  {:<lw$}{}", "metadata length", h.metadata_len);
    println!("  {:<lw$}{}", "signature length", h.signature_len);
    println!(
        "  {:<lw$}{} ({})",
        "installer length",
        h.installer_len,
        format_size(u64::from(h.installer_len))
    );
    println!("  {:<lw$}{}", "installer offset", entry.installer_offset());
    println!("  {:<lw$}{}", "file length", h.file_len());
    println!();

    let metadata = serde_json::to_string_pretty(entry.metadata.as_map())?;
    for line in metadata.lines() {
        println!("  {line}");
    }
    println!();

    match verification {
        Ok(()) => {
            println!("  {:<lw$}yes", "verified");
            Ok(())
        }
        Err(e) => {
            println!("  {:<lw$}no", "verified");
            bail!("{}: {e}", file.display())
        }
    }
}
