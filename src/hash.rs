// src/hash.rs

//! SHA-256 helpers for artifact integrity.
//!
//! Downloaded artifacts are verified against publisher-supplied digests
//! before they are allowed to replace anything on disk. Digests are
//! lowercase hex strings.

use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{self, Read};
use std::path::Path;

/// Compute the SHA-256 digest of a byte slice as lowercase hex
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute the SHA-256 digest of a reader as lowercase hex
///
/// Streams the content through a fixed buffer, never loading it entirely
/// into memory.
pub fn hash_reader<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compute the SHA-256 digest of a file as lowercase hex
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    hash_reader(&mut file)
}

/// Digest mismatch details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyError {
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sha256 mismatch: expected {}, got {}",
            self.expected, self.actual
        )
    }
}

impl std::error::Error for VerifyError {}

/// Verify a file matches an expected SHA-256 digest
///
/// The comparison is case-insensitive on the expected digest. A file that
/// cannot be read fails verification rather than erroring separately, so
/// callers have a single failure path.
pub fn verify_file_sha256(path: &Path, expected: &str) -> Result<(), VerifyError> {
    let actual = hash_file(path).map_err(|_| VerifyError {
        expected: expected.to_string(),
        actual: "<file read error>".to_string(),
    })?;

    if actual == expected.to_lowercase() {
        Ok(())
    } else {
        Err(VerifyError {
            expected: expected.to_string(),
            actual,
        })
    }
}
