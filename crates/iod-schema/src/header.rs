//! Fixed-size container header.

use crate::error::StructuralError;

/// Magic identity at the start of every container. The trailing digit is the
/// format version; the NUL terminator is part of the identity.
pub const FILE_IDENTITY: &[u8; 20] = b"gpii-iod-package-v1\0";

/// Size of the encoded header: identity plus three little-endian `u32` lengths.
pub const HEADER_LEN: usize = FILE_IDENTITY.len() + 3 * 4;

/// Lengths of the three blocks that follow the header.
///
/// The installer offset is never stored; it is derived from the other two
/// block lengths so a header cannot disagree with itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerHeader {
    /// Bytes of serialized metadata.
    pub metadata_len: u32,
    /// Bytes of raw signature.
    pub signature_len: u32,
    /// Bytes of installer payload (0 if none).
    pub installer_len: u32,
}

impl ContainerHeader {
    /// Build a header from block lengths.
    pub fn new(metadata_len: u32, signature_len: u32, installer_len: u32) -> Self {
        Self {
            metadata_len,
            signature_len,
            installer_len,
        }
    }

    /// Encode the header into its on-disk form.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        let id_len = FILE_IDENTITY.len();
        buf[..id_len].copy_from_slice(FILE_IDENTITY);
        buf[id_len..id_len + 4].copy_from_slice(&self.metadata_len.to_le_bytes());
        buf[id_len + 4..id_len + 8].copy_from_slice(&self.signature_len.to_le_bytes());
        buf[id_len + 8..id_len + 12].copy_from_slice(&self.installer_len.to_le_bytes());
        buf
    }

    /// Decode a header from the first bytes of a container.
    ///
    /// `buf` may be longer than [`HEADER_LEN`]; only the prefix is examined.
    ///
    /// # Errors
    ///
    /// Returns [`StructuralError::TruncatedHeader`] if fewer than
    /// [`HEADER_LEN`] bytes are supplied, and
    /// [`StructuralError::UnrecognizedFormat`] if the identity does not match.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, StructuralError> {
        if buf.len() < HEADER_LEN {
            return Err(StructuralError::TruncatedHeader {
                expected: HEADER_LEN,
                actual: buf.len(),
            });
        }

        let id_len = FILE_IDENTITY.len();
        if &buf[..id_len] != FILE_IDENTITY {
            return Err(StructuralError::UnrecognizedFormat);
        }

        let read_u32 = |at: usize| u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]);

        Ok(Self {
            metadata_len: read_u32(id_len),
            signature_len: read_u32(id_len + 4),
            installer_len: read_u32(id_len + 8),
        })
    }

    /// Combined length of the metadata and signature blocks.
    pub fn body_len(&self) -> u64 {
        u64::from(self.metadata_len) + u64::from(self.signature_len)
    }

    /// Absolute offset of the installer payload within the container.
    pub fn installer_offset(&self) -> u64 {
        HEADER_LEN as u64 + self.body_len()
    }

    /// Total size of a well-formed container with this header.
    pub fn file_len(&self) -> u64 {
        self.installer_offset() + u64::from(self.installer_len)
    }

    /// Whether the container carries an installer payload.
    pub fn has_installer(&self) -> bool {
        self.installer_len > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_len_is_identity_plus_three_words() {
        assert_eq!(HEADER_LEN, 32);
    }

    #[test]
    fn encodes_little_endian_lengths() {
        let header = ContainerHeader::new(0x0102_0304, 64, 7);
        let bytes = header.to_bytes();

        assert_eq!(&bytes[..20], FILE_IDENTITY);
        assert_eq!(&bytes[20..24], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[24..28], &[64, 0, 0, 0]);
        assert_eq!(&bytes[28..32], &[7, 0, 0, 0]);
        assert_eq!(ContainerHeader::from_bytes(&bytes).unwrap(), header);
    }

    #[test]
    fn offsets_follow_block_lengths() {
        let header = ContainerHeader::new(100, 64, 1000);
        assert_eq!(header.installer_offset(), 32 + 100 + 64);
        assert_eq!(header.file_len(), 32 + 100 + 64 + 1000);
        assert!(header.has_installer());
        assert!(!ContainerHeader::new(1, 1, 0).has_installer());
    }

    #[test]
    fn short_input_is_truncated_header() {
        let bytes = ContainerHeader::new(1, 2, 3).to_bytes();
        let err = ContainerHeader::from_bytes(&bytes[..31]).unwrap_err();
        assert!(matches!(
            err,
            StructuralError::TruncatedHeader {
                expected: 32,
                actual: 31
            }
        ));

        let err = ContainerHeader::from_bytes(&[]).unwrap_err();
        assert!(matches!(err, StructuralError::TruncatedHeader { actual: 0, .. }));
    }

    #[test]
    fn wrong_identity_is_unrecognized() {
        let mut bytes = ContainerHeader::new(1, 2, 3).to_bytes();
        bytes[18] = b'2';
        assert!(matches!(
            ContainerHeader::from_bytes(&bytes),
            Err(StructuralError::UnrecognizedFormat)
        ));

        let text = b"bad package:test-package0 plus some padding";
        assert!(matches!(
            ContainerHeader::from_bytes(text),
            Err(StructuralError::UnrecognizedFormat)
        ));
    }
}
