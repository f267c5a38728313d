//! Ed25519 key handling.
//!
//! Keys travel as PEM: public keys as SubjectPublicKeyInfo (`PUBLIC KEY`),
//! private keys as PKCS#8 v1 (`PRIVATE KEY`). The DER for Ed25519 is a fixed
//! prefix followed by the 32 raw key bytes, so no ASN.1 parser is needed.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// PEM label for public keys.
pub const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";
/// PEM label for private keys.
pub const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";

/// Conventional file name for a generated private key.
pub const PRIVATE_KEY_FILE: &str = "iod-private.pem";
/// Conventional file name for a generated public key.
pub const PUBLIC_KEY_FILE: &str = "iod-public.pem";

/// SubjectPublicKeyInfo prefix for an Ed25519 public key.
const ED25519_SPKI_PREFIX: [u8; 12] = [
    0x30, 0x2a, // SEQUENCE, 42 bytes
    0x30, 0x05, // SEQUENCE, 5 bytes (algorithm identifier)
    0x06, 0x03, // OID, 3 bytes
    0x2b, 0x65, 0x70, // 1.3.101.112 (Ed25519)
    0x03, 0x21, // BIT STRING, 33 bytes
    0x00, // unused bits
];

/// PKCS#8 v1 prefix for an Ed25519 private key.
const ED25519_PKCS8_PREFIX: [u8; 16] = [
    0x30, 0x2e, // SEQUENCE, 46 bytes
    0x02, 0x01, 0x00, // INTEGER 0 (version)
    0x30, 0x05, // SEQUENCE, 5 bytes (algorithm identifier)
    0x06, 0x03, // OID, 3 bytes
    0x2b, 0x65, 0x70, // 1.3.101.112 (Ed25519)
    0x04, 0x22, // OCTET STRING, 34 bytes
    0x04, 0x20, // OCTET STRING, 32 bytes (the seed)
];

const KEY_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid PEM: {0}")]
    Pem(#[from] pem::PemError),

    #[error("Expected a {expected} PEM block, found {found}")]
    WrongLabel { expected: &'static str, found: String },

    #[error("Not an Ed25519 {kind}: {len} bytes of DER")]
    UnsupportedDer { kind: &'static str, len: usize },

    #[error("Invalid Ed25519 public key: {0}")]
    InvalidPublicKey(String),
}

/// A signing key together with its public half.
#[derive(Clone)]
pub struct SigningKeyPair {
    signing_key: SigningKey,
}

impl std::fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("fingerprint", &self.fingerprint())
            .finish_non_exhaustive()
    }
}

impl SigningKeyPair {
    /// Generate a fresh key pair from the thread RNG.
    pub fn generate() -> Self {
        let mut seed = [0u8; KEY_LEN];
        rand::rng().fill_bytes(&mut seed);
        Self::from_seed(seed)
    }

    pub fn from_seed(seed: [u8; KEY_LEN]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Parse a `PRIVATE KEY` PEM. A bare 32-byte seed between the markers is
    /// accepted as well as PKCS#8.
    pub fn from_private_pem(text: &str) -> Result<Self, KeyError> {
        let parsed = pem::parse(text)?;
        if parsed.tag() != PRIVATE_KEY_LABEL {
            return Err(KeyError::WrongLabel {
                expected: PRIVATE_KEY_LABEL,
                found: parsed.tag().to_string(),
            });
        }
        let der = parsed.contents();

        let seed: [u8; KEY_LEN] = if der.len() == ED25519_PKCS8_PREFIX.len() + KEY_LEN
            && der.starts_with(&ED25519_PKCS8_PREFIX)
        {
            der[ED25519_PKCS8_PREFIX.len()..]
                .try_into()
                .map_err(|_| unsupported("private key", der.len()))?
        } else {
            der.try_into()
                .map_err(|_| unsupported("private key", der.len()))?
        };

        Ok(Self::from_seed(seed))
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// SubjectPublicKeyInfo DER of the public key.
    pub fn public_key_der(&self) -> Vec<u8> {
        public_key_der(&self.verifying_key())
    }

    pub fn public_key_pem(&self) -> String {
        pem::encode(&pem::Pem::new(PUBLIC_KEY_LABEL, self.public_key_der()))
    }

    pub fn private_key_pem(&self) -> String {
        let mut der = Vec::with_capacity(ED25519_PKCS8_PREFIX.len() + KEY_LEN);
        der.extend_from_slice(&ED25519_PKCS8_PREFIX);
        der.extend_from_slice(&self.signing_key.to_bytes());
        pem::encode(&pem::Pem::new(PRIVATE_KEY_LABEL, der))
    }

    /// Value embedded in signed metadata: base64 of the SPKI DER.
    pub fn embedded_public_key(&self) -> String {
        STANDARD.encode(self.public_key_der())
    }

    /// SHA-256 hex fingerprint of the SPKI DER, for display.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.public_key_der()))
    }
}

/// SubjectPublicKeyInfo DER for an Ed25519 public key.
pub fn public_key_der(key: &VerifyingKey) -> Vec<u8> {
    let mut der = Vec::with_capacity(ED25519_SPKI_PREFIX.len() + KEY_LEN);
    der.extend_from_slice(&ED25519_SPKI_PREFIX);
    der.extend_from_slice(key.as_bytes());
    der
}

/// Parse SubjectPublicKeyInfo DER into a verifying key.
pub fn verifying_key_from_der(der: &[u8]) -> Result<VerifyingKey, KeyError> {
    if der.len() != ED25519_SPKI_PREFIX.len() + KEY_LEN || !der.starts_with(&ED25519_SPKI_PREFIX) {
        return Err(unsupported("public key", der.len()));
    }

    let bytes: [u8; KEY_LEN] = der[ED25519_SPKI_PREFIX.len()..]
        .try_into()
        .map_err(|_| unsupported("public key", der.len()))?;

    VerifyingKey::from_bytes(&bytes).map_err(|e| KeyError::InvalidPublicKey(e.to_string()))
}

fn unsupported(kind: &'static str, len: usize) -> KeyError {
    KeyError::UnsupportedDer { kind, len }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::armor;

    #[test]
    fn pem_round_trip_preserves_key() {
        let pair = SigningKeyPair::generate();

        let restored = SigningKeyPair::from_private_pem(&pair.private_key_pem()).unwrap();
        assert_eq!(restored.verifying_key(), pair.verifying_key());

        let public_der = armor::read_pem(&pair.public_key_pem()).unwrap();
        assert_eq!(public_der.len(), 44);
        assert_eq!(verifying_key_from_der(&public_der).unwrap(), pair.verifying_key());
    }

    #[test]
    fn accepts_bare_seed_pem() {
        let seed = [9u8; 32];
        let text = armor::wrap_pem(PRIVATE_KEY_LABEL, &STANDARD.encode(seed));
        let pair = SigningKeyPair::from_private_pem(&text).unwrap();
        assert_eq!(pair.verifying_key(), SigningKeyPair::from_seed(seed).verifying_key());
    }

    #[test]
    fn public_pem_is_not_a_private_key() {
        let pair = SigningKeyPair::from_seed([1u8; 32]);
        match SigningKeyPair::from_private_pem(&pair.public_key_pem()) {
            Err(KeyError::WrongLabel { expected, found }) => {
                assert_eq!(expected, PRIVATE_KEY_LABEL);
                assert_eq!(found, PUBLIC_KEY_LABEL);
            }
            other => panic!("expected a label error, got {other:?}"),
        }
        assert!(matches!(
            SigningKeyPair::from_private_pem("not pem at all"),
            Err(KeyError::Pem(_))
        ));
    }

    #[test]
    fn rejects_foreign_der() {
        let text = armor::wrap_pem(PRIVATE_KEY_LABEL, &STANDARD.encode([0u8; 20]));
        assert!(matches!(
            SigningKeyPair::from_private_pem(&text),
            Err(KeyError::UnsupportedDer { len: 20, .. })
        ));
        assert!(verifying_key_from_der(&[0u8; 44]).is_err());
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let pair = SigningKeyPair::from_seed([5u8; 32]);
        let debug = format!("{pair:?}");
        assert!(debug.contains(&pair.fingerprint()));
        assert!(!debug.contains(&hex::encode([5u8; 32])));
    }
}
