use std::io;
use std::path::{Path, PathBuf};

use echo_crypto::HasherError;
use echo_types::EntryId;

/// Coarse classification of a [`LedgerError`], for callers that only need
/// to branch on the failure category.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input, rejected before anything was written.
    Validation,
    /// Filesystem access failed.
    Io,
    /// Stored data failed an integrity check.
    Corruption,
    /// A named item does not exist.
    NotFound,
}

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("entry {} is corrupted: {reason}", entry_label(.id, .position))]
    Corruption {
        /// `None` when the stored element is too damaged to yield an id.
        id: Option<EntryId>,
        /// Zero-based position in the ledger file.
        position: usize,
        reason: String,
    },

    #[error("no id left after {last}")]
    IdSpaceExhausted { last: EntryId },

    #[error("ledger file {} is malformed: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("snapshot {label:?} is corrupted: {reason}")]
    SnapshotCorrupted { label: String, reason: String },

    #[error("snapshot {0:?} not found")]
    SnapshotNotFound(String),

    #[error("timed out after {waited_ms}ms waiting for lock {}", path.display())]
    LockTimeout { path: PathBuf, waited_ms: u64 },

    #[error("in-memory ledger lock poisoned")]
    LockPoisoned,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("config error: {0}")]
    Config(String),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } | Self::Config(_) => ErrorKind::Validation,
            Self::Io { .. } | Self::LockTimeout { .. } | Self::LockPoisoned => ErrorKind::Io,
            Self::Serialization(_) => ErrorKind::Io,
            Self::Corruption { .. }
            | Self::Malformed { .. }
            | Self::SnapshotCorrupted { .. }
            | Self::IdSpaceExhausted { .. } => ErrorKind::Corruption,
            Self::SnapshotNotFound(_) => ErrorKind::NotFound,
        }
    }

    pub fn is_corruption(&self) -> bool {
        self.kind() == ErrorKind::Corruption
    }

    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}

impl From<HasherError> for LedgerError {
    fn from(err: HasherError) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// `#7` when the id is known, `at position 3` otherwise.
pub(crate) fn entry_label(id: &Option<EntryId>, position: &usize) -> String {
    match id {
        Some(id) => id.to_string(),
        None => format!("at position {position}"),
    }
}

/// Map an `io::Error` to [`LedgerError::Io`] tagged with the path involved.
pub(crate) fn io_at(path: &Path) -> impl FnOnce(io::Error) -> LedgerError + '_ {
    move |source| LedgerError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Convenience alias used throughout the ledger crate.
pub type Result<T> = std::result::Result<T, LedgerError>;
