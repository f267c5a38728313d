//! Package container codec.
//!
//! Creation runs in two phases. [`prepare_container`] reconciles the metadata
//! with the installer file and signs it without touching the destination;
//! only then are bytes written. A rejected package therefore never leaves a
//! file behind.
//!
//! Decoding reads the header and the metadata/signature block and stops
//! there. The installer payload is left on disk and streamed on demand by
//! offset, see [`CatalogEntry::installer_stream`].

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use iod_schema::metadata::{
    INSTALLER_FIELD, INSTALLER_HASH_FIELD, INSTALLER_SIZE_FIELD, is_declared_value,
};
use iod_schema::{
    ContainerHeader, HEADER_LEN, MetadataError, NotFoundError, PackageError, PackageMetadata,
    PackageResponse, StructuralError, VerificationError,
};
use serde_json::Value;

use crate::hashing;
use crate::installer::InstallerStream;
use crate::keys::SigningKeyPair;
use crate::signing::{self, SignedMetadata};

/// An installer file that has been measured and hashed.
#[derive(Debug, Clone)]
struct InstallerSource {
    path: PathBuf,
    size: u64,
}

/// A signed package ready to be written.
#[derive(Debug, Clone)]
pub struct PreparedContainer {
    header: ContainerHeader,
    signed: SignedMetadata,
    installer: Option<InstallerSource>,
}

impl PreparedContainer {
    /// Header describing the block lengths of the container to be written.
    pub fn header(&self) -> ContainerHeader {
        self.header
    }

    /// Final metadata, including computed installer fields and the public key.
    pub fn metadata(&self) -> &PackageMetadata {
        &self.signed.metadata
    }

    /// Ed25519 signature over the serialized metadata.
    pub fn signature(&self) -> &[u8] {
        &self.signed.signature
    }

    /// Write the complete container, streaming the installer from disk.
    /// Returns the number of bytes written.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<u64, PackageError> {
        out.write_all(&self.header.to_bytes())?;
        out.write_all(&self.signed.bytes)?;
        out.write_all(&self.signed.signature)?;

        if let Some(source) = &self.installer {
            let file = File::open(&source.path)?;
            let copied = io::copy(&mut file.take(source.size), out)?;
            if copied != source.size {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "installer {} shrank from {} to {copied} bytes while packaging",
                        source.path.display(),
                        source.size
                    ),
                )
                .into());
            }
        }

        Ok(self.header.file_len())
    }
}

/// Merge the installer's computed hash, size and file name into `metadata`.
///
/// Declared values must agree with what is computed; a stale or hand-edited
/// value is an error, never silently overwritten. Declaring an installer
/// without supplying one is also an error.
pub fn reconcile_installer(
    metadata: &PackageMetadata,
    installer: Option<&Path>,
) -> Result<PackageMetadata, PackageError> {
    reconcile(metadata, installer).map(|(data, _)| data)
}

fn reconcile(
    metadata: &PackageMetadata,
    installer: Option<&Path>,
) -> Result<(PackageMetadata, Option<InstallerSource>), PackageError> {
    let mut data = metadata.clone();
    let mut computed: Vec<(&'static str, Value)> = Vec::new();

    let source = match installer {
        Some(path) => {
            // Size comes from the filesystem before hashing, and is what the
            // header records.
            let size = fs::metadata(path)?.len();
            if size > u64::from(u32::MAX) {
                return Err(StructuralError::TooLarge {
                    what: "installer",
                    len: size,
                }
                .into());
            }

            let digest = hashing::hash_file(path)?;
            if digest.size != size {
                return Err(io::Error::other(format!(
                    "installer {} changed while it was being hashed",
                    path.display()
                ))
                .into());
            }

            computed.push((INSTALLER_HASH_FIELD, Value::from(digest.hash)));
            computed.push((INSTALLER_SIZE_FIELD, Value::from(size)));
            Some(InstallerSource {
                path: path.to_path_buf(),
                size,
            })
        }
        None => None,
    };

    if data.is_declared(INSTALLER_FIELD) {
        if installer.is_none() {
            return Err(MetadataError::InstallerExpected.into());
        }
    } else if let Some(path) = installer {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        computed.push((INSTALLER_FIELD, Value::from(file_name)));
    }

    let mut mismatch = None;
    for (field, value) in computed {
        match data.get(field) {
            Some(declared) if is_declared_value(declared) && *declared != value => {
                tracing::warn!(
                    "'{field}' is already specified in the package metadata, but is no longer correct. \
                     Current value: {declared}, new value: {value}"
                );
                mismatch.get_or_insert(MetadataError::Mismatch {
                    field: field.to_string(),
                    declared: declared.clone(),
                    computed: value,
                });
            }
            _ => {
                data.insert(field, value);
            }
        }
    }

    match mismatch {
        Some(err) => Err(err.into()),
        None => Ok((data, source)),
    }
}

/// Reconcile, sign and size a package without writing anything.
pub fn prepare_container(
    metadata: &PackageMetadata,
    installer: Option<&Path>,
    key: &SigningKeyPair,
) -> Result<PreparedContainer, PackageError> {
    metadata.require_name()?;

    let (data, installer) = reconcile(metadata, installer)?;
    let signed = signing::sign_metadata(&data, key)?;

    let header = ContainerHeader::new(
        block_len("metadata", signed.bytes.len())?,
        block_len("signature", signed.signature.len())?,
        installer.as_ref().map_or(0, |source| source.size as u32),
    );

    Ok(PreparedContainer {
        header,
        signed,
        installer,
    })
}

/// Build a complete container in memory.
pub fn create_container(
    metadata: &PackageMetadata,
    installer: Option<&Path>,
    key: &SigningKeyPair,
) -> Result<Vec<u8>, PackageError> {
    let prepared = prepare_container(metadata, installer, key)?;
    let mut buf = Vec::with_capacity(prepared.header.file_len() as usize);
    prepared.write_to(&mut buf)?;
    Ok(buf)
}

/// Build a container and write it to `dest`.
///
/// Bytes go to a temporary file beside `dest` (created with mode 0600 on
/// Unix) which is renamed into place once complete. On failure `dest` is left
/// untouched.
pub fn write_container(
    metadata: &PackageMetadata,
    installer: Option<&Path>,
    key: &SigningKeyPair,
    dest: &Path,
) -> Result<PreparedContainer, PackageError> {
    let prepared = prepare_container(metadata, installer, key)?;

    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        prepared.write_to(&mut writer)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| e.error)?;

    tracing::debug!(
        "wrote {} ({} bytes)",
        dest.display(),
        prepared.header.file_len()
    );
    Ok(prepared)
}

fn block_len(what: &'static str, len: usize) -> Result<u32, StructuralError> {
    u32::try_from(len).map_err(|_| StructuralError::TooLarge {
        what,
        len: len as u64,
    })
}

/// A decoded package container.
///
/// The installer payload is not held in memory; it is addressed by
/// [`Self::installer_range`] within the file at `path`.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// File the container was read from.
    pub path: PathBuf,
    /// Fixed header with the block lengths.
    pub header: ContainerHeader,
    /// Parsed metadata.
    pub metadata: PackageMetadata,
    /// The metadata block exactly as stored; the signature covers these bytes.
    pub metadata_json: String,
    /// Raw Ed25519 signature block.
    pub signature: Vec<u8>,
    /// Set once [`CatalogEntry::verify`] has succeeded.
    pub verified: bool,
}

impl CatalogEntry {
    /// Package name. Decoding guarantees it is present.
    pub fn name(&self) -> &str {
        self.metadata.name().unwrap_or_default()
    }

    /// Check the signature, recording the outcome in `verified`.
    pub fn verify(&mut self) -> Result<(), VerificationError> {
        let result = signing::verify_metadata(
            &self.metadata,
            self.metadata_json.as_bytes(),
            &self.signature,
        );
        self.verified = result.is_ok();
        result
    }

    /// Offset of the first installer byte within the container file.
    pub fn installer_offset(&self) -> u64 {
        self.header.installer_offset()
    }

    /// Byte range of the installer payload within the container file.
    pub fn installer_range(&self) -> Range<u64> {
        let start = self.header.installer_offset();
        start..start + u64::from(self.header.installer_len)
    }

    /// Whether the container carries an installer payload.
    pub fn has_installer(&self) -> bool {
        self.header.has_installer()
    }

    /// Open an independent stream over the installer payload.
    pub async fn installer_stream(&self) -> Result<InstallerStream, PackageError> {
        if !self.has_installer() {
            return Err(NotFoundError::NoInstaller(self.name().to_string()).into());
        }
        Ok(InstallerStream::open(&self.path, self.installer_range()).await?)
    }

    /// The serving-layer view of this package.
    pub fn response(&self) -> PackageResponse {
        PackageResponse {
            package_data: self.metadata_json.clone(),
            package_data_signature: STANDARD.encode(&self.signature),
            installer: self
                .has_installer()
                .then(|| PackageResponse::installer_route(self.name())),
        }
    }
}

/// Decode a container file without verifying it.
pub fn decode_container(path: &Path) -> Result<CatalogEntry, PackageError> {
    let mut reader = BufReader::new(File::open(path)?);
    decode_from_reader(&mut reader, path)
}

/// Decode an in-memory container without verifying it.
pub fn decode_bytes(bytes: &[u8], path: impl Into<PathBuf>) -> Result<CatalogEntry, PackageError> {
    decode_from_reader(&mut &bytes[..], path)
}

/// Decode header, metadata and signature from `reader`. The reader is left
/// positioned at the start of the installer payload.
pub fn decode_from_reader<R: Read>(
    reader: &mut R,
    path: impl Into<PathBuf>,
) -> Result<CatalogEntry, PackageError> {
    let mut header_buf = Vec::with_capacity(HEADER_LEN);
    reader
        .by_ref()
        .take(HEADER_LEN as u64)
        .read_to_end(&mut header_buf)?;
    let header = ContainerHeader::from_bytes(&header_buf)?;

    // Grow the buffer as data arrives rather than trusting the declared
    // length for the allocation.
    let expected = header.body_len();
    let mut body = Vec::new();
    reader.by_ref().take(expected).read_to_end(&mut body)?;
    if (body.len() as u64) < expected {
        return Err(StructuralError::TruncatedBody {
            expected,
            actual: body.len() as u64,
        }
        .into());
    }

    let signature = body.split_off(header.metadata_len as usize);
    let metadata_json =
        String::from_utf8(body).map_err(|e| MetadataError::InvalidUtf8(e.utf8_error()))?;
    let metadata = PackageMetadata::from_json_slice(metadata_json.as_bytes())?;
    metadata.require_name()?;

    Ok(CatalogEntry {
        path: path.into(),
        header,
        metadata,
        metadata_json,
        signature,
        verified: false,
    })
}

/// Decode and verify a container file.
pub fn read_container(path: &Path) -> Result<CatalogEntry, PackageError> {
    let mut entry = decode_container(path)?;
    entry.verify()?;
    Ok(entry)
}
