use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use echo_crypto::EntryHasher;
use echo_types::{Context, EntryContent, MemoryEntry, Timestamp};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{CorruptionPolicy, LedgerConfig};
use crate::error::{io_at, LedgerError, Result};
use crate::lock::LedgerLock;
use crate::persist::{self, Replace};
use crate::snapshot::{self, Snapshot, SnapshotInfo, SNAPSHOT_EXTENSION};
use crate::traits::{LedgerReader, LedgerWriter};
use crate::validation::{self, StoredEntry, VerificationReport};

/// File-backed ledger bound to one directory.
///
/// The ledger file is a pretty-printed JSON array of [`MemoryEntry`]
/// records. Every append rewrites it through a temporary file and an atomic
/// rename while holding [`LedgerLock`], so a concurrent reader sees either
/// the old history or the new one. Reads take no lock.
///
/// Prior entries are re-emitted unchanged on every rewrite, including
/// entries that fail verification or do not decode at all.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    config: LedgerConfig,
}

impl LedgerStore {
    /// Bind a store to `root` with default settings. Nothing is created on
    /// disk until the first write.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_config(LedgerConfig::for_root(root))
    }

    pub fn with_config(config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.config.ledger_path()
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.config.snapshot_path()
    }

    /// Check every stored entry, whatever the corruption policy.
    pub fn verify(&self) -> Result<VerificationReport> {
        let stored = self.load_stored()?;
        let report = validation::verify_stored(&stored)?;
        debug!(
            total = report.total,
            corrupted = report.corrupted.len(),
            "ledger verified"
        );
        Ok(report)
    }

    /// Write the current verified history to `echo_state/<label>.json`.
    ///
    /// The ledger file is not touched. An existing label is rejected.
    pub fn snapshot(&self, label: &str) -> Result<SnapshotInfo> {
        snapshot::validate_label(label)?;
        let entries = self.read_all()?;
        let snap = Snapshot::capture(label, entries)?;
        let bytes = snap.to_bytes()?;
        let path = snapshot::snapshot_file(&self.snapshot_dir(), label);

        let _lock = self.lock()?;
        persist::write_atomic(&path, &bytes, self.config.sync_mode, Replace::NoClobber).map_err(
            |e| {
                if persist::is_already_exists(&e) {
                    LedgerError::validation("label", format!("snapshot {label:?} already exists"))
                } else {
                    e
                }
            },
        )?;

        debug!(label, entries = snap.entries.len(), path = %path.display(), "snapshot written");
        Ok(snap.info(&path))
    }

    /// Read a snapshot back and check its integrity.
    pub fn load_snapshot(&self, label: &str) -> Result<Snapshot> {
        snapshot::validate_label(label)?;
        let path = snapshot::snapshot_file(&self.snapshot_dir(), label);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LedgerError::SnapshotNotFound(label.to_string()))
            }
            Err(e) => return Err(io_at(&path)(e)),
        };
        let snap = Snapshot::from_bytes(label, &bytes)?;
        if snap.label != label {
            return Err(LedgerError::SnapshotCorrupted {
                label: label.to_string(),
                reason: format!("file claims label {:?}", snap.label),
            });
        }
        snap.verify()?;
        Ok(snap)
    }

    /// All readable snapshots, sorted by label. Unreadable files are logged
    /// and left out.
    pub fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>> {
        let dir = self.snapshot_dir();
        let read_dir = match fs::read_dir(&dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_at(&dir)(e)),
        };

        let mut infos = Vec::new();
        for dir_entry in read_dir {
            let path = dir_entry.map_err(io_at(&dir))?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(SNAPSHOT_EXTENSION) {
                continue;
            }
            let Some(label) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            match self.load_snapshot(label) {
                Ok(snap) => infos.push(snap.info(&path)),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable snapshot"),
            }
        }
        infos.sort_by(|a, b| a.label.cmp(&b.label));
        Ok(infos)
    }

    fn lock(&self) -> Result<LedgerLock> {
        let root = self.root();
        fs::create_dir_all(root).map_err(io_at(root))?;
        LedgerLock::acquire(&self.config.lock_path(), self.config.lock_timeout())
    }

    /// Parse the ledger file without verifying it. A missing or blank file
    /// is an empty ledger; anything other than a JSON array is malformed.
    /// Elements are decoded one by one so a damaged entry stays local.
    fn load_stored(&self) -> Result<Vec<StoredEntry>> {
        let path = self.ledger_path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_at(&path)(e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        let malformed = |reason: String| LedgerError::Malformed {
            path: path.clone(),
            reason,
        };
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Array(items)) => Ok(items.into_iter().map(StoredEntry::decode).collect()),
            Ok(_) => Err(malformed("expected a JSON array of entries".to_string())),
            Err(e) => Err(malformed(e.to_string())),
        }
    }

    fn encode(stored: &[StoredEntry]) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(stored)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

impl LedgerWriter for LedgerStore {
    fn append(
        &self,
        category: &str,
        thought: &str,
        context: Option<Context>,
    ) -> Result<MemoryEntry> {
        validation::validate_input(category, thought)?;
        let context = context.unwrap_or_default();

        let _lock = self.lock()?;
        let mut stored = self.load_stored()?;
        let report = validation::verify_stored(&stored)?;
        if let Some(bad) = report.first_corrupted() {
            match self.config.corruption_policy {
                CorruptionPolicy::Reject => return Err(bad.into()),
                CorruptionPolicy::Skip => warn!(
                    corrupted = report.corrupted.len(),
                    "appending to a ledger with corrupted entries"
                ),
            }
        }

        let id = validation::next_id(stored.iter().filter_map(StoredEntry::id))?;
        let entry = EntryHasher::seal(EntryContent {
            id,
            category,
            thought,
            context: &context,
            timestamp: Timestamp::now(),
        })?;

        stored.push(StoredEntry::Decoded(entry.clone()));
        let bytes = Self::encode(&stored)?;
        persist::write_atomic(
            &self.ledger_path(),
            &bytes,
            self.config.sync_mode,
            Replace::Overwrite,
        )?;

        debug!(id = id.get(), category, entries = stored.len(), "ledger append");
        Ok(entry)
    }
}

impl LedgerReader for LedgerStore {
    fn read_all(&self) -> Result<Vec<MemoryEntry>> {
        let stored = self.load_stored()?;
        let total = stored.len();
        let entries = validation::resolve(stored, self.config.corruption_policy)?;
        debug!(total, returned = entries.len(), "ledger read");
        Ok(entries)
    }
}
