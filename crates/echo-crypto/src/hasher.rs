use echo_types::{Checksum, EntryContent, MemoryEntry};
use sha2::{Digest, Sha256};

use crate::canonical::canonical_bytes;

/// SHA-256 checksummer for ledger entries.
///
/// The checksum covers the canonical bytes of the entry content (see
/// [`crate::canonical`]) and nothing else, so
/// `sha256(canonical_bytes(entry.content()))` reproduces the stored value.
pub struct EntryHasher;

impl EntryHasher {
    /// Compute the checksum of entry content.
    pub fn checksum(content: &EntryContent<'_>) -> Result<Checksum, HasherError> {
        let bytes = canonical_bytes(content)?;
        Ok(Self::hash_bytes(&bytes))
    }

    /// Checksum the content and attach the result, producing a stored entry.
    pub fn seal(content: EntryContent<'_>) -> Result<MemoryEntry, HasherError> {
        let checksum = Self::checksum(&content)?;
        Ok(content.into_entry(checksum))
    }

    /// Recompute the checksum of a stored entry and compare it to the stored
    /// value.
    pub fn verify(entry: &MemoryEntry) -> Result<(), HasherError> {
        let computed = Self::checksum(&entry.content())?;
        if computed != entry.checksum {
            return Err(HasherError::Mismatch {
                stored: entry.checksum,
                computed,
            });
        }
        Ok(())
    }

    /// Raw SHA-256 of arbitrary bytes.
    pub fn hash_bytes(data: &[u8]) -> Checksum {
        let digest = Sha256::digest(data);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Checksum::from_digest(out)
    }
}

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag that is prepended to every hash
/// computation, so a snapshot digest can never collide with a digest of the
/// same bytes taken for another purpose.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for snapshot payloads.
    pub const SNAPSHOT: Self = Self {
        domain: "echo-snapshot-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Checksum {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        Checksum::from_digest(*hasher.finalize().as_bytes())
    }

    /// Hash a serializable value as compact JSON with domain separation.
    pub fn hash_json<T: serde::Serialize>(&self, value: &T) -> Result<Checksum, HasherError> {
        let data =
            serde_json::to_vec(value).map_err(|e| HasherError::Serialization(e.to_string()))?;
        Ok(self.hash(&data))
    }

    /// Verify that data produces the expected digest.
    pub fn verify(&self, data: &[u8], expected: &Checksum) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("checksum mismatch: stored {stored}, computed {computed}")]
    Mismatch { stored: Checksum, computed: Checksum },
}
