// SPDX-License-Identifier: Apache-2.0
//! Fixed-capacity inline string.

use std::fmt;

use crate::codec::{ByteReader, ByteWriter, CodecError, Record};
use crate::StoreError;

/// A zero-padded string of at most `CAP` bytes, packed inline.
///
/// The content must be UTF-8 without interior NUL bytes; the live length is
/// the position of the first zero byte. Comparison is lexicographic on the
/// padded byte array, which coincides with string ordering because the pad
/// byte sorts below every content byte.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Varchar<const CAP: usize> {
    bytes: [u8; CAP],
}

impl<const CAP: usize> Default for Varchar<CAP> {
    fn default() -> Self {
        Self { bytes: [0; CAP] }
    }
}

impl<const CAP: usize> Varchar<CAP> {
    /// Build from a string slice.
    ///
    /// Fails with [`StoreError::Overflow`] when `text` exceeds `CAP` bytes
    /// or contains a NUL byte.
    pub fn new(text: &str) -> Result<Self, StoreError> {
        let raw = text.as_bytes();
        if raw.len() > CAP || raw.contains(&0) {
            return Err(StoreError::Overflow);
        }
        let mut bytes = [0_u8; CAP];
        bytes[..raw.len()].copy_from_slice(raw);
        Ok(Self { bytes })
    }

    /// Number of live bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.iter().position(|b| *b == 0).unwrap_or(CAP)
    }

    /// True when the string is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes[0] == 0
    }

    /// View the live content as a string slice.
    ///
    /// Construction and decoding both validate UTF-8, so the live bytes are
    /// always well-formed.
    #[must_use]
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len()]).unwrap_or("")
    }

    /// Stable 64-bit content hash (BLAKE3 digest prefix, little-endian).
    ///
    /// Hash-keyed indexes persist this value, so it must never change
    /// across runs or platforms.
    #[must_use]
    pub fn hash(&self) -> u64 {
        let digest = blake3::hash(&self.bytes[..self.len()]);
        let mut prefix = [0_u8; 8];
        prefix.copy_from_slice(&digest.as_bytes()[..8]);
        u64::from_le_bytes(prefix)
    }
}

impl<const CAP: usize> fmt::Display for Varchar<CAP> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<const CAP: usize> fmt::Debug for Varchar<CAP> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Varchar({:?})", self.as_str())
    }
}

impl<const CAP: usize> Record for Varchar<CAP> {
    const BYTES: usize = CAP;

    fn store(&self, out: &mut ByteWriter<'_>) {
        out.put_bytes(&self.bytes);
    }

    fn load(input: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let raw = input.bytes(CAP)?;
        let mut bytes = [0_u8; CAP];
        bytes.copy_from_slice(raw);
        let this = Self { bytes };
        std::str::from_utf8(&this.bytes[..this.len()]).map_err(|_| CodecError::InvalidUtf8)?;
        Ok(this)
    }
}
