//! Hashing engine for the ledger
//!
//! This module provides:
//! - SHA-256 (default) and BLAKE3 digests over UTF-8 strings
//! - Lowercase hex encoding of the 32-byte digest
//! - Name-based algorithm lookup that fails instead of degrading
//!
//! Digests are pure functions of their input. No state is kept between
//! calls, so the same string always yields the same hex digest.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Digest length in bytes for every supported algorithm
pub const DIGEST_LEN: usize = 32;

/// Supported hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum HashAlgorithm {
    /// SHA-256 (FIPS 180-4)
    #[default]
    Sha256,
    /// BLAKE3
    Blake3,
}

impl HashAlgorithm {
    /// Look up an algorithm by name
    ///
    /// Accepts `SHA-256`, `SHA256` and `BLAKE3` in any case. Unknown names
    /// are reported as [`Error::HashingUnavailable`].
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "SHA-256" | "SHA256" => Ok(HashAlgorithm::Sha256),
            "BLAKE3" => Ok(HashAlgorithm::Blake3),
            _ => Err(Error::HashingUnavailable(name.to_string())),
        }
    }

    /// Canonical algorithm name
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Blake3 => "BLAKE3",
        }
    }

    /// Hash raw bytes
    pub fn digest(&self, data: &[u8]) -> [u8; DIGEST_LEN] {
        match self {
            HashAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(data);
                hasher.finalize().into()
            }
            HashAlgorithm::Blake3 => *blake3::hash(data).as_bytes(),
        }
    }

    /// Hash a string and return the lowercase hex digest
    pub fn digest_hex(&self, input: &str) -> String {
        hex::encode(self.digest(input.as_bytes()))
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
