use std::fmt;

use serde::{Deserialize, Serialize};

use crate::checksum::Checksum;
use crate::session::SESSION_CONTEXT_KEY;
use crate::timestamp::Timestamp;
use crate::value::Context;

/// Sequence number of an entry within one ledger. The first entry is `1`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(u64);

impl EntryId {
    pub const FIRST: Self = Self(1);

    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }

    /// The id that follows this one, or `None` once the id space is used up.
    pub fn checked_next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryId({})", self.0)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for EntryId {
    fn from(seq: u64) -> Self {
        Self(seq)
    }
}

/// One recorded thought as stored in the ledger file.
///
/// Field declaration order is the on-disk key order:
/// `id, category, thought, context, timestamp, checksum`. Unknown keys are
/// rejected, so every stored byte is either hashed or the checksum itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryEntry {
    pub id: EntryId,
    pub category: String,
    pub thought: String,
    #[serde(default)]
    pub context: Context,
    pub timestamp: Timestamp,
    pub checksum: Checksum,
}

impl MemoryEntry {
    /// Borrow the hashed fields of this entry.
    pub fn content(&self) -> EntryContent<'_> {
        EntryContent {
            id: self.id,
            category: &self.category,
            thought: &self.thought,
            context: &self.context,
            timestamp: self.timestamp,
        }
    }

    /// The session that recorded this entry, if one was attached.
    pub fn session_id(&self) -> Option<&str> {
        self.context.get(SESSION_CONTEXT_KEY).and_then(|v| v.as_str())
    }
}

/// The checksummed part of an entry, everything except `checksum` itself.
///
/// Serializing this struct yields the canonical checksum input: fields in
/// the fixed order `id, category, thought, context, timestamp`, context keys
/// sorted.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct EntryContent<'a> {
    pub id: EntryId,
    pub category: &'a str,
    pub thought: &'a str,
    pub context: &'a Context,
    pub timestamp: Timestamp,
}

impl<'a> EntryContent<'a> {
    /// Attach a checksum, producing an owned entry.
    pub fn into_entry(self, checksum: Checksum) -> MemoryEntry {
        MemoryEntry {
            id: self.id,
            category: self.category.to_string(),
            thought: self.thought.to_string(),
            context: self.context.clone(),
            timestamp: self.timestamp,
            checksum,
        }
    }
}
