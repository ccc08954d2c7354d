//! Integrity primitives for the Echo ledger.
//!
//! Entry checksums are plain SHA-256 over the canonical JSON of an entry's
//! content, so they can be reproduced with any stock tool. Snapshot digests
//! use domain-separated BLAKE3.
//!
//! All crypto operations wrap established libraries.

pub mod canonical;
pub mod hasher;

pub use canonical::canonical_bytes;
pub use hasher::{ContentHasher, EntryHasher, HasherError};
