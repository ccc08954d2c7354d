use std::collections::BTreeSet;

use echo_crypto::{EntryHasher, HasherError};
use echo_types::{EntryId, MemoryEntry};
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::warn;

use crate::config::CorruptionPolicy;
use crate::error::{entry_label, LedgerError, Result};

/// Check `append` inputs before anything touches the disk.
///
/// Blank (empty or whitespace-only) values are rejected; accepted values are
/// stored exactly as given.
pub fn validate_input(category: &str, thought: &str) -> Result<()> {
    if category.trim().is_empty() {
        return Err(LedgerError::validation("category", "must not be empty"));
    }
    if thought.trim().is_empty() {
        return Err(LedgerError::validation("thought", "must not be empty"));
    }
    Ok(())
}

/// One element of the ledger array as found on disk.
///
/// Elements that do not decode as a [`MemoryEntry`] are kept verbatim so a
/// rewrite puts them back unchanged.
#[derive(Clone, Debug, PartialEq)]
pub enum StoredEntry {
    Decoded(MemoryEntry),
    Undecodable { raw: Value, reason: String },
}

impl StoredEntry {
    pub fn decode(raw: Value) -> Self {
        match serde_json::from_value::<MemoryEntry>(raw.clone()) {
            Ok(entry) => Self::Decoded(entry),
            Err(e) => Self::Undecodable {
                raw,
                reason: e.to_string(),
            },
        }
    }

    /// The entry id, read from the raw element when decoding failed.
    pub fn id(&self) -> Option<EntryId> {
        match self {
            Self::Decoded(entry) => Some(entry.id),
            Self::Undecodable { raw, .. } => {
                raw.get("id").and_then(Value::as_u64).map(EntryId::new)
            }
        }
    }

    pub fn into_entry(self) -> Option<MemoryEntry> {
        match self {
            Self::Decoded(entry) => Some(entry),
            Self::Undecodable { .. } => None,
        }
    }
}

impl From<MemoryEntry> for StoredEntry {
    fn from(entry: MemoryEntry) -> Self {
        Self::Decoded(entry)
    }
}

impl Serialize for StoredEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Decoded(entry) => entry.serialize(serializer),
            Self::Undecodable { raw, .. } => raw.serialize(serializer),
        }
    }
}

/// Result of verifying every stored entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub total: usize,
    pub verified: usize,
    pub corrupted: Vec<CorruptEntry>,
}

impl VerificationReport {
    /// Returns `true` if every entry verified.
    pub fn is_clean(&self) -> bool {
        self.corrupted.is_empty()
    }

    /// Fraction of entries that verified, or `None` for an empty ledger.
    pub fn integrity_rate(&self) -> Option<f64> {
        (self.total > 0).then(|| self.verified as f64 / self.total as f64)
    }

    pub fn first_corrupted(&self) -> Option<&CorruptEntry> {
        self.corrupted.first()
    }
}

/// A stored entry that failed verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CorruptEntry {
    /// `None` when the element is too damaged to yield an id.
    pub id: Option<EntryId>,
    /// Zero-based position in the ledger file.
    pub position: usize,
    pub kind: ViolationKind,
    pub description: String,
}

impl CorruptEntry {
    /// `#7`, or `at position 3` when the id is unknown.
    pub fn label(&self) -> String {
        entry_label(&self.id, &self.position)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Recomputed checksum differs from the stored one.
    ChecksumMismatch,
    /// Id is zero or not greater than every id before it.
    SequenceViolation,
    /// The element is not a well-formed entry: a missing or unknown key, a
    /// mistyped value, or a non-canonical timestamp or checksum.
    Undecodable,
}

impl From<&CorruptEntry> for LedgerError {
    fn from(bad: &CorruptEntry) -> Self {
        LedgerError::Corruption {
            id: bad.id,
            position: bad.position,
            reason: bad.description.clone(),
        }
    }
}

/// Verify checksums and id ordering of entries in file order.
///
/// Each entry is reported at most once; a checksum mismatch takes precedence
/// over a sequence violation.
pub fn verify_entries(entries: &[MemoryEntry]) -> Result<VerificationReport> {
    check_all(entries.iter().map(Ok))
}

/// Like [`verify_entries`], with undecodable elements reported as
/// [`ViolationKind::Undecodable`].
pub fn verify_stored(stored: &[StoredEntry]) -> Result<VerificationReport> {
    check_all(stored.iter().map(|slot| match slot {
        StoredEntry::Decoded(entry) => Ok(entry),
        StoredEntry::Undecodable { reason, .. } => Err((slot.id(), reason.as_str())),
    }))
}

type Slot<'a> = std::result::Result<&'a MemoryEntry, (Option<EntryId>, &'a str)>;

fn check_all<'a>(slots: impl Iterator<Item = Slot<'a>>) -> Result<VerificationReport> {
    let mut total = 0;
    let mut corrupted = Vec::new();
    let mut highest: Option<EntryId> = None;

    for (position, slot) in slots.enumerate() {
        total += 1;
        let entry = match slot {
            Ok(entry) => entry,
            Err((id, reason)) => {
                corrupted.push(CorruptEntry {
                    id,
                    position,
                    kind: ViolationKind::Undecodable,
                    description: format!("undecodable entry: {reason}"),
                });
                continue;
            }
        };

        let violation = match EntryHasher::verify(entry) {
            Err(HasherError::Mismatch { stored, computed }) => Some((
                ViolationKind::ChecksumMismatch,
                format!("checksum mismatch: stored {stored}, computed {computed}"),
            )),
            Err(other) => return Err(other.into()),
            Ok(()) if entry.id.get() == 0 => Some((
                ViolationKind::SequenceViolation,
                "ids start at 1".to_string(),
            )),
            Ok(()) => match highest {
                Some(prev) if entry.id <= prev => Some((
                    ViolationKind::SequenceViolation,
                    format!("id {} does not follow {}", entry.id, prev),
                )),
                _ => None,
            },
        };

        if let Some((kind, description)) = violation {
            corrupted.push(CorruptEntry {
                id: Some(entry.id),
                position,
                kind,
                description,
            });
        }
        highest = highest.max(Some(entry.id));
    }

    Ok(VerificationReport {
        total,
        verified: total - corrupted.len(),
        corrupted,
    })
}

/// Apply a corruption policy to elements loaded from storage.
///
/// `Reject` fails on the first corrupted entry; `Skip` drops corrupted
/// entries and logs each one.
pub fn resolve(stored: Vec<StoredEntry>, policy: CorruptionPolicy) -> Result<Vec<MemoryEntry>> {
    let report = verify_stored(&stored)?;

    let skipped: BTreeSet<usize> = match (policy, report.first_corrupted()) {
        (_, None) => BTreeSet::new(),
        (CorruptionPolicy::Reject, Some(bad)) => return Err(bad.into()),
        (CorruptionPolicy::Skip, Some(_)) => {
            for bad in &report.corrupted {
                warn!(
                    entry = %bad.label(),
                    position = bad.position,
                    reason = %bad.description,
                    "skipping corrupted ledger entry"
                );
            }
            report.corrupted.iter().map(|c| c.position).collect()
        }
    };

    Ok(stored
        .into_iter()
        .enumerate()
        .filter(|(position, _)| !skipped.contains(position))
        .filter_map(|(_, slot)| slot.into_entry())
        .collect())
}

/// [`resolve`] for entries that are already decoded.
pub fn apply_policy(
    entries: Vec<MemoryEntry>,
    policy: CorruptionPolicy,
) -> Result<Vec<MemoryEntry>> {
    resolve(entries.into_iter().map(StoredEntry::from).collect(), policy)
}

/// The id for the next append: one past the highest id present, corrupted
/// entries included, so ids are never reused.
pub fn next_id(ids: impl IntoIterator<Item = EntryId>) -> Result<EntryId> {
    match ids.into_iter().max() {
        None => Ok(EntryId::FIRST),
        Some(last) => last
            .checked_next()
            .ok_or(LedgerError::IdSpaceExhausted { last }),
    }
}
