//! iod - IoD package directory tool
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Read-side operations over a directory of signed package containers: the
//! same loading, lookup and installer streaming a serving process performs,
//! driven from the command line.

pub mod cmd;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use iod_core::IodConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "iod")]
#[command(author, version, about = "iod - IoD package directory tool")]
pub struct Cli {
    /// Package directory (defaults to ~/.iod/packages)
    #[arg(long, short, global = true, env = "IOD_PACKAGE_DIR")]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the packages in the directory, then any files that were skipped
    List,
    /// Print the serving response for a package
    Info {
        /// Package name
        name: String,
    },
    /// Decode and verify a single container file
    Inspect {
        /// Container file
        file: PathBuf,
    },
    /// Write a package's installer payload to a file
    Extract {
        /// Package name
        name: String,
        /// Destination file
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Resolve the package directory from the flag, then the environment.
pub fn package_dir(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    IodConfig::from_env()
        .map(|config| config.package_dir)
        .context("Could not determine home directory. Set IOD_PACKAGE_DIR or pass --dir.")
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    let kb = bytes as f64 / 1024.0;
    let mb = kb / 1024.0;
    if mb >= 1024.0 {
        format!("{:.1} GB", mb / 1024.0)
    } else if kb >= 1024.0 {
        format!("{mb:.1} MB")
    } else if kb >= 1.0 {
        format!("{kb:.1} KB")
    } else {
        format!("{bytes} B")
    }
}
