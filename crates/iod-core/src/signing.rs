//! Signing and verification of serialized package metadata.
//!
//! The signer's public key is embedded in the metadata before serialization,
//! so the signature covers it: swapping in a different key invalidates the
//! package just like editing any other field.

use ed25519_dalek::{Signature, Signer};
use iod_schema::metadata::PUBLIC_KEY_FIELD;
use iod_schema::{MetadataError, PackageMetadata, VerificationError};

use crate::armor;
use crate::keys::{self, PUBLIC_KEY_LABEL, SigningKeyPair};

/// Length of a raw Ed25519 signature.
pub const SIGNATURE_LEN: usize = 64;

/// Metadata with the public key embedded, its exact serialized bytes, and
/// the signature over those bytes.
#[derive(Debug, Clone)]
pub struct SignedMetadata {
    pub metadata: PackageMetadata,
    pub bytes: Vec<u8>,
    pub signature: Vec<u8>,
}

/// Embed the signer's public key, serialize, and sign.
///
/// A caller-supplied `publicKey` is tolerated only when it already equals the
/// signer's key.
pub fn sign_metadata(
    metadata: &PackageMetadata,
    key: &SigningKeyPair,
) -> Result<SignedMetadata, MetadataError> {
    let mut data = metadata.clone();
    let embedded = key.embedded_public_key();

    if data.is_declared(PUBLIC_KEY_FIELD) && data.public_key() != Some(embedded.as_str()) {
        return Err(MetadataError::ReservedField(PUBLIC_KEY_FIELD));
    }
    data.insert(PUBLIC_KEY_FIELD, embedded);

    let bytes = data.to_json_bytes()?;
    let signature = key.signing_key().sign(&bytes).to_bytes().to_vec();

    Ok(SignedMetadata {
        metadata: data,
        bytes,
        signature,
    })
}

/// Check `signature` over `bytes` using the key embedded in `metadata`.
///
/// `metadata` must be the parse of `bytes`; the bytes are what is verified.
pub fn verify_metadata(
    metadata: &PackageMetadata,
    bytes: &[u8],
    signature: &[u8],
) -> Result<(), VerificationError> {
    let encoded = metadata
        .public_key()
        .ok_or(VerificationError::MissingPublicKey)?;

    // The field holds bare base64; armor it and read it back like any PEM key.
    let der = armor::read_pem(&armor::wrap_pem(PUBLIC_KEY_LABEL, encoded))
        .map_err(|e| VerificationError::InvalidPublicKey(e.to_string()))?;
    let verifying_key = keys::verifying_key_from_der(&der)
        .map_err(|e| VerificationError::InvalidPublicKey(e.to_string()))?;

    let signature: [u8; SIGNATURE_LEN] = signature
        .try_into()
        .map_err(|_| VerificationError::InvalidSignatureLength(signature.len()))?;

    verifying_key
        .verify_strict(bytes, &Signature::from_bytes(&signature))
        .map_err(|_| VerificationError::SignatureMismatch)
}

/// Boolean form of verification over raw bytes: anything that goes wrong,
/// including unparseable metadata, is simply "not authentic".
pub fn is_authentic(bytes: &[u8], signature: &[u8]) -> bool {
    PackageMetadata::from_json_slice(bytes)
        .is_ok_and(|metadata| verify_metadata(&metadata, bytes, signature).is_ok())
}
