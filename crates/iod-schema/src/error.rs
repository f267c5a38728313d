//! Error taxonomy for package containers.
//!
//! The split matters to callers: a [`StructuralError`] means "not this format,
//! or damaged beyond parsing", a [`VerificationError`] means "parsed fine but
//! not authentic".

use serde_json::Value;
use thiserror::Error;

/// The file is not a container, or is damaged beyond parsing.
#[derive(Error, Debug)]
pub enum StructuralError {
    /// Fewer bytes than a full header were available.
    #[error("File is too short (header is incomplete): expected {expected} bytes, got {actual}")]
    TruncatedHeader {
        /// Header length in bytes.
        expected: usize,
        /// Bytes actually read.
        actual: usize,
    },

    /// The identity magic did not match.
    #[error("This file isn't a recognisable package file")]
    UnrecognizedFormat,

    /// The metadata and signature blocks were cut short.
    #[error("File is too short (or the header is corrupted): expected {expected} body bytes, got {actual}")]
    TruncatedBody {
        /// Declared metadata + signature length.
        expected: u64,
        /// Bytes actually read.
        actual: u64,
    },

    /// A block does not fit in a 32-bit length field.
    #[error("{what} is too large for a package file: {len} bytes")]
    TooLarge {
        /// Which block overflowed.
        what: &'static str,
        /// Its actual length.
        len: u64,
    },
}

/// Metadata could not be parsed, or disagrees with the files it describes.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// The metadata block is not valid UTF-8 JSON.
    #[error("Error parsing package metadata: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The metadata block is not UTF-8 text.
    #[error("Package metadata is not valid UTF-8: {0}")]
    InvalidUtf8(#[source] std::str::Utf8Error),

    /// The metadata is valid JSON but not an object.
    #[error("Package metadata must be a JSON object")]
    NotAnObject,

    /// The mandatory `name` field is absent, empty, or not a string.
    #[error("Package metadata has no name")]
    MissingName,

    /// A computed field is already declared with a different value.
    #[error("'{field}' is already specified in the package metadata, but is no longer correct (declared {declared}, computed {computed})")]
    Mismatch {
        /// The conflicting field.
        field: String,
        /// Value supplied by the caller.
        declared: Value,
        /// Value derived from the installer file.
        computed: Value,
    },

    /// The metadata names an installer but no installer file was supplied.
    #[error("Package metadata expects an installer file")]
    InstallerExpected,

    /// A reserved field was supplied with a value that conflicts with signing.
    #[error("'{0}' is reserved and does not match the signing key")]
    ReservedField(&'static str),

    /// Serializing the metadata failed.
    #[error("Failed to serialize package metadata: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// The metadata block is not authentic.
#[derive(Error, Debug)]
pub enum VerificationError {
    /// No `publicKey` field in the metadata.
    #[error("Package metadata has no embedded public key")]
    MissingPublicKey,

    /// The embedded key could not be decoded or is not an Ed25519 key.
    #[error("Embedded public key is invalid: {0}")]
    InvalidPublicKey(String),

    /// The signature block has the wrong length.
    #[error("Signature is malformed: expected 64 bytes, got {0}")]
    InvalidSignatureLength(usize),

    /// The signature does not match the metadata bytes.
    #[error("Package metadata failed verification")]
    SignatureMismatch,
}

/// A catalog lookup had nothing to return.
#[derive(Error, Debug)]
pub enum NotFoundError {
    /// No package with this name is indexed.
    #[error("No such package: {0}")]
    Package(String),

    /// The package exists but carries no installer payload.
    #[error("No installer for package: {0}")]
    NoInstaller(String),
}

/// Any failure while creating, reading or serving a container.
#[derive(Error, Debug)]
pub enum PackageError {
    /// See [`StructuralError`].
    #[error(transparent)]
    Structural(#[from] StructuralError),

    /// See [`MetadataError`].
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// See [`VerificationError`].
    #[error(transparent)]
    Verification(#[from] VerificationError),

    /// See [`NotFoundError`].
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PackageError {
    /// Short category label, for logs and summaries.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Structural(_) => "structural",
            Self::Metadata(_) => "metadata",
            Self::Verification(_) => "verification",
            Self::NotFound(_) => "not-found",
            Self::Io(_) => "io",
        }
    }
}
