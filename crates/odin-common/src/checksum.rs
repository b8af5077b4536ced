//! Digest utilities
//!
//! MD5 is used for content-derived row identities, where the digest is part of
//! the persisted contract and must stay byte-compatible with other producers.
//! SHA-256 fingerprints identify the exact source files a run consumed.

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

const READ_BUFFER_SIZE: usize = 8192;

/// Lowercase hexadecimal MD5 digest (32 characters)
pub fn md5_hex(data: impl AsRef<[u8]>) -> String {
    format!("{:x}", md5::compute(data.as_ref()))
}

/// Returns true when `value` has the shape of an [`md5_hex`] digest
pub fn is_md5_hex(value: &str) -> bool {
    value.len() == 32 && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// SHA-256 fingerprint of a file plus the number of bytes hashed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub sha256: String,
    pub size_bytes: u64,
}

/// Compute SHA-256 over any readable source
pub fn compute_sha256<R: Read>(reader: &mut R) -> Result<Fingerprint> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; READ_BUFFER_SIZE];
    let mut size_bytes = 0u64;

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
        size_bytes += bytes_read as u64;
    }

    Ok(Fingerprint {
        sha256: hex::encode(hasher.finalize()),
        size_bytes,
    })
}

/// Compute the SHA-256 fingerprint of a file
pub fn fingerprint_file(path: impl AsRef<Path>) -> Result<Fingerprint> {
    let mut file = std::fs::File::open(path)?;
    compute_sha256(&mut file)
}
