//! Streaming SHA-512 digests for installer payloads.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha512};

/// Digest and byte count of a file, computed in a single pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    /// Lowercase hex SHA-512.
    pub hash: String,
    /// Bytes hashed.
    pub size: u64,
}

/// Hash a file (streaming, 64KB buffer).
pub fn hash_file(path: &Path) -> std::io::Result<FileDigest> {
    hash_reader(File::open(path)?)
}

/// Hash an in-memory buffer.
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha512::digest(data))
}

fn hash_reader(mut reader: impl Read) -> std::io::Result<FileDigest> {
    let mut hasher = Sha512::new();
    let mut buffer = vec![0u8; 65536];
    let mut size = 0u64;

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
        size += bytes_read as u64;
    }

    Ok(FileDigest {
        hash: hex::encode(hasher.finalize()),
        size,
    })
}
