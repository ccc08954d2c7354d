//! Append-only memory ledger for Echo.
//!
//! This crate is the heart of Echo. It provides:
//! - `LedgerStore`, the file-backed ledger under `.echo_memory/`
//! - `LedgerWriter` / `LedgerReader` trait boundaries
//! - `InMemoryLedger` implementation for tests and embedding
//! - Entry verification with a configurable corruption policy
//! - Labeled snapshots under `echo_state/`
//! - Summary, continuity and session projections, and a recorder for
//!   structured thoughts tagged with a session id
//!
//! ```no_run
//! use echo_ledger::{LedgerReader, LedgerStore, LedgerWriter};
//!
//! let store = LedgerStore::open(".echo_memory")?;
//! store.append("milestone", "Switched to FastAPI", None)?;
//! for entry in store.read_all()? {
//!     println!("{} {}", entry.id, entry.thought);
//! }
//! # Ok::<(), echo_ledger::LedgerError>(())
//! ```

pub mod config;
pub mod error;
pub mod lock;
pub mod memory;
mod persist;
pub mod projection;
pub mod recorder;
pub mod snapshot;
pub mod store;
pub mod traits;
pub mod validation;

pub use config::{CorruptionPolicy, LedgerConfig, SyncMode};
pub use error::{ErrorKind, LedgerError};
pub use lock::LedgerLock;
pub use memory::InMemoryLedger;
pub use projection::{
    ComponentNote, ContinuityContext, LedgerSummary, PatternNote, SessionReflection,
};
pub use recorder::ThoughtRecorder;
pub use snapshot::{Snapshot, SnapshotInfo};
pub use store::LedgerStore;
pub use traits::{LedgerReader, LedgerWriter};
pub use validation::{CorruptEntry, StoredEntry, VerificationReport, ViolationKind};
