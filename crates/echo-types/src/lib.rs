//! Foundation types for the Echo ledger.
//!
//! Every other Echo crate depends on `echo-types`. The types here describe
//! what a ledger entry looks like on disk; hashing lives in `echo-crypto` and
//! persistence in `echo-ledger`.
//!
//! # Key Types
//!
//! - [`MemoryEntry`] — One recorded thought with its stored checksum
//! - [`EntryId`] — Monotonic sequence number assigned at append time
//! - [`Checksum`] — 32-byte digest rendered as 64 lowercase hex characters
//! - [`Timestamp`] — UTC creation time with a canonical millisecond rendering
//! - [`ContextValue`] — Tagged union of JSON-compatible context values
//! - [`SessionId`] — Identifier of the working session that recorded an entry

pub mod category;
pub mod checksum;
pub mod entry;
pub mod error;
pub mod session;
pub mod timestamp;
pub mod value;

pub use checksum::Checksum;
pub use entry::{EntryContent, EntryId, MemoryEntry};
pub use error::TypeError;
pub use session::{SessionId, SESSION_CONTEXT_KEY};
pub use timestamp::Timestamp;
pub use value::{context_from_json, Context, ContextValue};
