use std::sync::RwLock;

use echo_crypto::EntryHasher;
use echo_types::{Context, EntryContent, MemoryEntry, Timestamp};

use crate::config::CorruptionPolicy;
use crate::error::LedgerError;
use crate::snapshot::Snapshot;
use crate::traits::{LedgerReader, LedgerWriter};
use crate::validation::{self, VerificationReport};

/// In-memory ledger for tests, local demos, and embedding.
///
/// Validation, numbering and checksums match [`crate::LedgerStore`]; only
/// persistence is missing.
pub struct InMemoryLedger {
    policy: CorruptionPolicy,
    entries: RwLock<Vec<MemoryEntry>>,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::from_entries(Vec::new())
    }

    /// Start from existing entries, stored as given. They are verified on
    /// read like file-backed entries.
    pub fn from_entries(entries: Vec<MemoryEntry>) -> Self {
        Self {
            policy: CorruptionPolicy::default(),
            entries: RwLock::new(entries),
        }
    }

    /// Rebuild a ledger from a verified snapshot.
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self, LedgerError> {
        snapshot.verify()?;
        Ok(Self::from_entries(snapshot.entries.clone()))
    }

    pub fn with_policy(mut self, policy: CorruptionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn verify(&self) -> Result<VerificationReport, LedgerError> {
        let guard = self.entries.read().map_err(|_| LedgerError::LockPoisoned)?;
        validation::verify_entries(&guard)
    }
}

impl LedgerWriter for InMemoryLedger {
    fn append(
        &self,
        category: &str,
        thought: &str,
        context: Option<Context>,
    ) -> Result<MemoryEntry, LedgerError> {
        validation::validate_input(category, thought)?;
        let context = context.unwrap_or_default();

        let mut guard = self.entries.write().map_err(|_| LedgerError::LockPoisoned)?;
        if self.policy == CorruptionPolicy::Reject {
            if let Some(bad) = validation::verify_entries(&guard)?.first_corrupted() {
                return Err(bad.into());
            }
        }

        let id = validation::next_id(guard.iter().map(|e| e.id))?;
        let entry = EntryHasher::seal(EntryContent {
            id,
            category,
            thought,
            context: &context,
            timestamp: Timestamp::now(),
        })?;
        guard.push(entry.clone());
        Ok(entry)
    }
}

impl LedgerReader for InMemoryLedger {
    fn read_all(&self) -> Result<Vec<MemoryEntry>, LedgerError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| LedgerError::LockPoisoned)?
            .clone();
        validation::apply_policy(entries, self.policy)
    }
}
