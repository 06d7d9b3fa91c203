// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Framing of cache files.
//!
//! ```text
//! [magic: 4 bytes][version: u32 LE][len: u64 LE][crc32: u32 LE][payload: len bytes]
//! ```
//!
//! The payload is [bincode]-encoded and covered by the CRC-32 checksum.
//! The version is checked before anything else, so that a schema change
//! is reported as such and not as corruption.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{CacheError, Corruption};

/// Version of the cache file layout and payloads.
/// Must be bumped on any change to the serialized types.
pub const FORMAT_VERSION: u32 = 1;

pub(super) const GRAPH_MAGIC: [u8; 4] = *b"RNGB";
pub(super) const DATA_MAGIC: [u8; 4] = *b"RNID";
pub(super) const INDEX_MAGIC: [u8; 4] = *b"RNIX";

const HEADER_LEN: usize = 4 + 4 + 8 + 4;

/// Structural description of the region index data file,
/// stored in the region index header file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(super) struct IndexHeader {
    pub entries: u64,
    pub data_len: u64,
    pub data_crc: u32,
}

/// Serializes `value` into a framed record.
pub(super) fn encode<T: Serialize + ?Sized>(
    path: &Path,
    magic: [u8; 4],
    value: &T,
) -> Result<Vec<u8>, CacheError> {
    let payload = bincode::serialize(value).map_err(|e| {
        CacheError::io(path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })?;

    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(&magic);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    buf.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Validates the framing of a record read from `path` and deserializes its payload.
pub(super) fn decode<T: DeserializeOwned>(
    path: &Path,
    magic: [u8; 4],
    data: &[u8],
) -> Result<T, CacheError> {
    if data.is_empty() {
        return Err(CacheError::corrupt(path, Corruption::Empty));
    }
    if data.len() < HEADER_LEN {
        return Err(CacheError::corrupt(path, Corruption::Truncated));
    }

    let (header, payload) = data.split_at(HEADER_LEN);
    if header[0..4] != magic {
        return Err(CacheError::corrupt(path, Corruption::BadMagic));
    }

    let version = u32::from_le_bytes(le_bytes(&header[4..8]));
    if version != FORMAT_VERSION {
        return Err(CacheError::Version {
            path: path.to_path_buf(),
            found: version,
            expected: FORMAT_VERSION,
        });
    }

    let len = u64::from_le_bytes(le_bytes(&header[8..16]));
    if len != payload.len() as u64 {
        let reason = if len > payload.len() as u64 {
            Corruption::Truncated
        } else {
            Corruption::Inconsistent(format!(
                "{} trailing bytes after the payload",
                payload.len() as u64 - len
            ))
        };
        return Err(CacheError::corrupt(path, reason));
    }

    let crc = u32::from_le_bytes(le_bytes(&header[16..20]));
    if crc32fast::hash(payload) != crc {
        return Err(CacheError::corrupt(path, Corruption::Checksum));
    }

    bincode::deserialize(payload)
        .map_err(|e| CacheError::corrupt(path, Corruption::Decode(e.to_string())))
}

#[inline]
fn le_bytes<const N: usize>(s: &[u8]) -> [u8; N] {
    let mut b = [0u8; N];
    b.copy_from_slice(s);
    b
}
