use echo_types::{Context, EntryId, MemoryEntry};

use crate::error::LedgerError;

/// Write boundary for ledger append operations.
pub trait LedgerWriter: Send + Sync {
    /// Validate, timestamp, number, checksum and persist a new entry.
    fn append(
        &self,
        category: &str,
        thought: &str,
        context: Option<Context>,
    ) -> Result<MemoryEntry, LedgerError>;
}

/// Read boundary for ledger queries.
///
/// Everything is derived from [`LedgerReader::read_all`], so every query
/// sees the same verified history under the same corruption policy.
pub trait LedgerReader: Send + Sync {
    /// All entries in append order, verified.
    fn read_all(&self) -> Result<Vec<MemoryEntry>, LedgerError>;

    fn get(&self, id: EntryId) -> Result<Option<MemoryEntry>, LedgerError> {
        Ok(self.read_all()?.into_iter().find(|e| e.id == id))
    }

    fn by_category(&self, category: &str) -> Result<Vec<MemoryEntry>, LedgerError> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|e| e.category == category)
            .collect())
    }

    /// The last `n` entries, oldest first.
    fn recent(&self, n: usize) -> Result<Vec<MemoryEntry>, LedgerError> {
        let mut entries = self.read_all()?;
        let skip = entries.len().saturating_sub(n);
        Ok(entries.split_off(skip))
    }

    fn len(&self) -> Result<usize, LedgerError> {
        Ok(self.read_all()?.len())
    }

    fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.len()? == 0)
    }
}
