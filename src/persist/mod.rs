//! Binary artifact format for trained models.
//!
//! An artifact is a 32-byte header followed by a Postcard-encoded
//! [`Payload`](payload::Payload):
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       4     Magic ("CRBT")
//! 4       1     Version major
//! 5       1     Version minor
//! 6       2     Reserved
//! 8       2     Flags (bitfield, currently all zero)
//! 10      2     Reserved
//! 12      4     Payload size (bytes, little-endian)
//! 16      4     CRC32 checksum of payload
//! 20      4     Number of features
//! 24      8     Reserved
//! ```
//!
//! The checksum covers the payload only, so header corruption surfaces as
//! a magic or version error and payload corruption as a checksum error.

pub mod payload;

use std::io::{Read, Write};

use thiserror::Error;

use crate::features::N_FEATURES;
use crate::model::CreditModel;
use crate::persist::payload::{Payload, PayloadV1};
use crate::repr::TreeValidationError;

/// Magic bytes identifying a model artifact.
pub const MAGIC: &[u8; 4] = b"CRBT";

/// Current format version (major).
pub const CURRENT_VERSION_MAJOR: u8 = 1;

/// Current format version (minor).
pub const CURRENT_VERSION_MINOR: u8 = 0;

/// Size of the artifact header in bytes.
pub const HEADER_SIZE: usize = 32;

/// Errors while writing an artifact.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] postcard::Error),
}

/// Errors while reading an artifact.
#[derive(Debug, Error)]
pub enum DeserializeError {
    /// Wrong magic bytes.
    #[error("not a model artifact")]
    NotAModel,

    /// Artifact written by a newer format revision.
    #[error("artifact requires format version {major}.{minor} or later")]
    UnsupportedVersion { major: u8, minor: u8 },

    /// Payload bytes do not match the stored checksum.
    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// Stream ended before the declared length.
    #[error("artifact truncated: expected {expected} bytes")]
    Truncated { expected: usize },

    /// Payload decoded but its contents are inconsistent.
    #[error("corrupt payload: {0}")]
    CorruptPayload(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decoding error: {0}")]
    Decoding(#[from] postcard::Error),
}

impl From<TreeValidationError> for DeserializeError {
    fn from(err: TreeValidationError) -> Self {
        DeserializeError::CorruptPayload(format!("invalid tree structure: {err:?}"))
    }
}

/// Parsed artifact header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatHeader {
    pub version_major: u8,
    pub version_minor: u8,
    pub flags: u16,
    pub payload_size: u32,
    pub checksum: u32,
    pub n_features: u32,
}

impl FormatHeader {
    fn new(payload: &[u8]) -> Self {
        Self {
            version_major: CURRENT_VERSION_MAJOR,
            version_minor: CURRENT_VERSION_MINOR,
            flags: 0,
            payload_size: payload.len() as u32,
            checksum: crc32fast::hash(payload),
            n_features: N_FEATURES as u32,
        }
    }

    fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4] = self.version_major;
        buf[5] = self.version_minor;
        buf[8..10].copy_from_slice(&self.flags.to_le_bytes());
        buf[12..16].copy_from_slice(&self.payload_size.to_le_bytes());
        buf[16..20].copy_from_slice(&self.checksum.to_le_bytes());
        buf[20..24].copy_from_slice(&self.n_features.to_le_bytes());
        buf
    }

    fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Result<Self, DeserializeError> {
        if &buf[0..4] != MAGIC {
            return Err(DeserializeError::NotAModel);
        }

        let version_major = buf[4];
        let version_minor = buf[5];
        if version_major > CURRENT_VERSION_MAJOR {
            return Err(DeserializeError::UnsupportedVersion {
                major: version_major,
                minor: version_minor,
            });
        }

        Ok(Self {
            version_major,
            version_minor,
            flags: u16::from_le_bytes([buf[8], buf[9]]),
            payload_size: u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
            checksum: u32::from_le_bytes([buf[16], buf[17], buf[18], buf[19]]),
            n_features: u32::from_le_bytes([buf[20], buf[21], buf[22], buf[23]]),
        })
    }
}

/// Write a model artifact to `writer`.
pub fn write_model<W: Write>(model: &CreditModel, writer: &mut W) -> Result<(), SerializeError> {
    let payload = postcard::to_allocvec(&Payload::from(model))?;
    let header = FormatHeader::new(&payload);
    writer.write_all(&header.to_bytes())?;
    writer.write_all(&payload)?;
    Ok(())
}

/// Read a model artifact from `reader`, verifying header, checksum and
/// tree structure.
pub fn read_model<R: Read>(reader: &mut R) -> Result<CreditModel, DeserializeError> {
    let mut header_buf = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header_buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            DeserializeError::Truncated { expected: HEADER_SIZE }
        } else {
            DeserializeError::Io(e)
        }
    })?;
    let header = FormatHeader::from_bytes(&header_buf)?;

    let mut payload = vec![0u8; header.payload_size as usize];
    reader.read_exact(&mut payload).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            DeserializeError::Truncated { expected: header.payload_size as usize }
        } else {
            DeserializeError::Io(e)
        }
    })?;

    let actual = crc32fast::hash(&payload);
    if actual != header.checksum {
        return Err(DeserializeError::ChecksumMismatch { expected: header.checksum, actual });
    }

    if header.n_features != N_FEATURES as u32 {
        return Err(DeserializeError::CorruptPayload(format!(
            "artifact declares {} features, expected {}",
            header.n_features, N_FEATURES
        )));
    }

    let Payload::V1(PayloadV1 { meta, imputer, forest }) = postcard::from_bytes(&payload)?;
    let forest = forest.into_forest(N_FEATURES)?;
    Ok(CreditModel::from_parts(imputer.into_imputer(), forest, meta))
}

/// Serialize a model to an in-memory artifact.
pub fn to_bytes(model: &CreditModel) -> Result<Vec<u8>, SerializeError> {
    let mut out = Vec::new();
    write_model(model, &mut out)?;
    Ok(out)
}

/// Deserialize a model from an in-memory artifact.
pub fn from_bytes(bytes: &[u8]) -> Result<CreditModel, DeserializeError> {
    let mut cursor = std::io::Cursor::new(bytes);
    read_model(&mut cursor)
}
