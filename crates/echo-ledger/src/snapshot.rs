//! Labeled point-in-time copies of a ledger.
//!
//! A snapshot file holds the summary projection, a full copy of the verified
//! entries, and a BLAKE3 digest over those entries. Snapshots live in their
//! own directory and are never overwritten.

use std::path::{Path, PathBuf};

use echo_crypto::{ContentHasher, EntryHasher};
use echo_types::{Checksum, EntryId, MemoryEntry, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::projection::LedgerSummary;

/// Version of the snapshot file format.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// File extension of snapshot files.
pub const SNAPSHOT_EXTENSION: &str = "json";

const MAX_LABEL_LEN: usize = 64;

/// A stored snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version for compatibility.
    pub version: u32,
    pub label: String,
    pub created_at: Timestamp,
    pub summary: LedgerSummary,
    pub entries: Vec<MemoryEntry>,
    /// Domain-separated BLAKE3 over the compact JSON of `entries`.
    pub digest: Checksum,
}

/// What `list_snapshots` reports about each snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SnapshotInfo {
    pub label: String,
    pub path: PathBuf,
    pub created_at: Timestamp,
    pub entry_count: usize,
    pub head: Option<EntryId>,
    pub digest: Checksum,
}

impl Snapshot {
    /// Capture verified entries under a label.
    pub fn capture(label: &str, entries: Vec<MemoryEntry>) -> Result<Self> {
        validate_label(label)?;
        let digest = digest_of(&entries)?;
        Ok(Self {
            version: SNAPSHOT_FORMAT_VERSION,
            label: label.to_string(),
            created_at: Timestamp::now(),
            summary: LedgerSummary::build(&entries),
            entries,
            digest,
        })
    }

    /// Check format version, digest, and every entry checksum.
    pub fn verify(&self) -> Result<()> {
        let corrupted = |reason: String| LedgerError::SnapshotCorrupted {
            label: self.label.clone(),
            reason,
        };

        if self.version != SNAPSHOT_FORMAT_VERSION {
            return Err(corrupted(format!(
                "unsupported format version {}",
                self.version
            )));
        }
        let digest = digest_of(&self.entries)?;
        if digest != self.digest {
            return Err(corrupted(format!(
                "digest mismatch: stored {}, computed {digest}",
                self.digest
            )));
        }
        for entry in &self.entries {
            EntryHasher::verify(entry)
                .map_err(|e| corrupted(format!("entry {}: {e}", entry.id)))?;
        }
        Ok(())
    }

    pub fn info(&self, path: &Path) -> SnapshotInfo {
        SnapshotInfo {
            label: self.label.clone(),
            path: path.to_path_buf(),
            created_at: self.created_at,
            entry_count: self.entries.len(),
            head: self.summary.head,
            digest: self.digest,
        }
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes =
            serde_json::to_vec_pretty(self).map_err(|e| LedgerError::Serialization(e.to_string()))?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    pub(crate) fn from_bytes(label: &str, bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| LedgerError::SnapshotCorrupted {
            label: label.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Labels become file names, so they are restricted to
/// `[A-Za-z0-9._-]`, at most 64 characters, not starting with `.`.
pub fn validate_label(label: &str) -> Result<()> {
    if label.is_empty() {
        return Err(LedgerError::validation("label", "must not be empty"));
    }
    if label.len() > MAX_LABEL_LEN {
        return Err(LedgerError::validation(
            "label",
            format!("must be at most {MAX_LABEL_LEN} characters"),
        ));
    }
    if label.starts_with('.') {
        return Err(LedgerError::validation("label", "must not start with '.'"));
    }
    if let Some(c) = label
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(*c, '.' | '_' | '-')))
    {
        return Err(LedgerError::validation(
            "label",
            format!("contains unsupported character {c:?}"),
        ));
    }
    Ok(())
}

/// Path of the snapshot file for `label` inside `dir`.
pub fn snapshot_file(dir: &Path, label: &str) -> PathBuf {
    dir.join(format!("{label}.{SNAPSHOT_EXTENSION}"))
}

fn digest_of(entries: &[MemoryEntry]) -> Result<Checksum> {
    Ok(ContentHasher::SNAPSHOT.hash_json(&entries)?)
}
