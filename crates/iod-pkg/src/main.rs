//! `iod-pkg` - The IoD package builder.
//!
//! Generates signing keys, wraps installers and their metadata into signed
//! package containers, and verifies existing containers.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use iod_core::keys::{PRIVATE_KEY_FILE, PUBLIC_KEY_FILE};
use iod_core::{PackageMetadata, SigningKeyPair, read_container, write_container};
use iod_schema::PACKAGE_EXTENSION;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "iod-pkg")]
#[command(about = "Build and check IoD package containers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new Ed25519 signing keypair
    Keygen {
        /// Directory to write the PEM files to
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Create a signed package container
    Create {
        /// JSON file holding the package metadata
        #[arg(short, long)]
        metadata: PathBuf,
        /// Installer to embed
        #[arg(short, long)]
        installer: Option<PathBuf>,
        /// PEM private key
        #[arg(short, long, env = "IOD_SIGNING_KEY")]
        key: PathBuf,
        /// Output container file (defaults to `<name>.morphic-package`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Verify one or more package containers
    Verify {
        /// Container files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Keygen { out_dir } => cli_keygen(&out_dir),
        Commands::Create {
            metadata,
            installer,
            key,
            output,
        } => cli_create(&metadata, installer.as_deref(), &key, output),
        Commands::Verify { files } => cli_verify(&files),
    }
}

fn cli_keygen(out_dir: &Path) -> Result<()> {
    let private_path = out_dir.join(PRIVATE_KEY_FILE);
    let public_path = out_dir.join(PUBLIC_KEY_FILE);
    if private_path.exists() {
        bail!("{} already exists, refusing to overwrite", private_path.display());
    }

    println!("  generating ed25519 keypair");
    let key = SigningKeyPair::generate();

    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    write_private(&private_path, &key.private_key_pem())?;
    fs::write(&public_path, key.public_key_pem())
        .with_context(|| format!("Failed to write {}", public_path.display()))?;

    println!("  wrote {}", private_path.display());
    println!("  wrote {}", public_path.display());
    println!("  fingerprint {}", key.fingerprint());
    Ok(())
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &str) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(contents.as_bytes())?;
    Ok(())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

fn cli_create(
    metadata_path: &Path,
    installer: Option<&Path>,
    key_path: &Path,
    output: Option<PathBuf>,
) -> Result<()> {
    let raw = fs::read(metadata_path)
        .with_context(|| format!("Failed to read {}", metadata_path.display()))?;
    let metadata = PackageMetadata::from_json_slice(&raw)
        .with_context(|| format!("Invalid metadata in {}", metadata_path.display()))?;

    let output = match output {
        Some(path) => path,
        None => PathBuf::from(format!("{}.{PACKAGE_EXTENSION}", metadata.require_name()?)),
    };

    let pem = fs::read_to_string(key_path)
        .with_context(|| format!("Failed to read key {}", key_path.display()))?;
    let key = SigningKeyPair::from_private_pem(&pem)
        .with_context(|| format!("Invalid private key in {}", key_path.display()))?;
    tracing::debug!("signing with key {}", key.fingerprint());

    let prepared = write_container(&metadata, installer, &key, &output)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let header = prepared.header();
    println!(
        "  created {} ({} bytes, installer {} bytes)",
        output.display(),
        header.file_len(),
        header.installer_len
    );
    Ok(())
}

fn cli_verify(files: &[PathBuf]) -> Result<()> {
    let mut failed = 0;
    for path in files {
        match read_container(path) {
            Ok(entry) => println!("  ok     {} ({})", path.display(), entry.name()),
            Err(e) => {
                println!("  FAILED {}: {e}", path.display());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} packages failed verification", files.len());
    }
    Ok(())
}
