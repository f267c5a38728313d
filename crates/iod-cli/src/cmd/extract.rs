use anyhow::{Context, Result, bail};
use futures::StreamExt;
use iod_core::hashing;
use iod_core::load_catalog;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Stream a package's installer to `output`, then check it against the
/// hash recorded in the signed metadata.
pub async fn extract(dir: &Path, name: &str, output: &Path) -> Result<()> {
    let load = load_catalog(dir).context("Failed to load package directory")?;
    let Some(entry) = load.store.get(name) else {
        bail!("Package '{name}' not found");
    };

    let mut stream = entry
        .installer_stream()
        .await
        .with_context(|| format!("Cannot stream installer for '{name}'"))?;

    let mut file = tokio::fs::File::create(output)
        .await
        .with_context(|| format!("Failed to create {}", output.display()))?;
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    drop(file);

    if let Some(expected) = entry.metadata.installer_hash() {
        let digest = hashing::hash_file(output)?;
        if digest.hash != expected {
            tokio::fs::remove_file(output).await.ok();
            bail!("Installer for '{name}' does not match its recorded hash");
        }
    }

    tracing::debug!("extracted {name} to {}", output.display());
    println!(
        "  {name} -> {} ({} bytes)",
        output.display(),
        entry.header.installer_len
    );
    Ok(())
}
