use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// Default ledger directory, relative to the invoking project.
pub const DEFAULT_ROOT: &str = ".echo_memory";
pub const DEFAULT_LEDGER_FILE: &str = "evolution.json";
pub const DEFAULT_SNAPSHOT_DIR: &str = "echo_state";
const LOCK_SUFFIX: &str = ".lock";

/// Flush/sync strategy for ledger writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` the new file and its directory before returning.
    #[default]
    EveryWrite,
    /// Rely on OS page-cache buffering; the rename is still atomic.
    OsDefault,
}

/// What to do with entries whose checksum or sequence does not verify.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptionPolicy {
    /// Any corrupted entry fails the whole read, and appends are refused.
    #[default]
    Reject,
    /// Corrupted entries are left out of reads with a warning. They stay in
    /// the file and keep being reported by `verify`.
    Skip,
}

/// Configuration for a [`crate::LedgerStore`].
///
/// Every field has a default, so a TOML file only needs the keys it wants
/// to change:
///
/// ```toml
/// root = ".echo_memory"
/// corruption_policy = "skip"
/// lock_timeout_ms = 2000
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Directory holding the ledger file and the snapshot directory.
    pub root: PathBuf,
    /// Ledger file name inside `root`.
    pub ledger_file: String,
    /// Snapshot directory name inside `root`.
    pub snapshot_dir: String,
    pub sync_mode: SyncMode,
    pub corruption_policy: CorruptionPolicy,
    /// How long a writer waits for the ledger lock.
    pub lock_timeout_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            ledger_file: DEFAULT_LEDGER_FILE.into(),
            snapshot_dir: DEFAULT_SNAPSHOT_DIR.into(),
            sync_mode: SyncMode::default(),
            corruption_policy: CorruptionPolicy::default(),
            lock_timeout_ms: 5_000,
        }
    }
}

impl LedgerConfig {
    /// Default configuration bound to the given directory.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn with_policy(mut self, policy: CorruptionPolicy) -> Self {
        self.corruption_policy = policy;
        self
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML config file. A relative `root` inside the file is taken
    /// relative to the process working directory, like the default.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            LedgerError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| LedgerError::Config(e.to_string()))
    }

    /// Reject names that would escape `root` or collide with each other.
    pub fn validate(&self) -> Result<()> {
        check_file_name("ledger_file", &self.ledger_file)?;
        check_file_name("snapshot_dir", &self.snapshot_dir)?;
        if self.ledger_file == self.snapshot_dir {
            return Err(LedgerError::Config(
                "ledger_file and snapshot_dir must differ".into(),
            ));
        }
        Ok(())
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.root.join(&self.ledger_file)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(format!("{}{LOCK_SUFFIX}", self.ledger_file))
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.root.join(&self.snapshot_dir)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

fn check_file_name(key: &str, name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(LedgerError::Config(format!(
            "{key} must be a plain file name, got {name:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = LedgerConfig::default();
        assert_eq!(c.root, PathBuf::from(".echo_memory"));
        assert_eq!(c.ledger_path(), PathBuf::from(".echo_memory/evolution.json"));
        assert_eq!(c.snapshot_path(), PathBuf::from(".echo_memory/echo_state"));
        assert_eq!(c.lock_path(), PathBuf::from(".echo_memory/evolution.json.lock"));
        assert_eq!(c.sync_mode, SyncMode::EveryWrite);
        assert_eq!(c.corruption_policy, CorruptionPolicy::Reject);
        assert_eq!(c.lock_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let c = LedgerConfig::from_toml_str(
            r#"
            root = "/tmp/echo"
            corruption_policy = "skip"
            sync_mode = "os_default"
            "#,
        )
        .unwrap();
        assert_eq!(c.root, PathBuf::from("/tmp/echo"));
        assert_eq!(c.corruption_policy, CorruptionPolicy::Skip);
        assert_eq!(c.sync_mode, SyncMode::OsDefault);
        assert_eq!(c.ledger_file, DEFAULT_LEDGER_FILE);
        assert_eq!(c.lock_timeout_ms, 5_000);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let err = LedgerConfig::from_toml_str(r#"corruption_policy = "ignore""#).unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }

    #[test]
    fn path_like_names_are_rejected() {
        for bad in ["", "..", "a/b", r"a\b"] {
            let c = LedgerConfig {
                ledger_file: bad.into(),
                ..LedgerConfig::default()
            };
            assert!(c.validate().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn colliding_names_are_rejected() {
        let c = LedgerConfig {
            ledger_file: "state".into(),
            snapshot_dir: "state".into(),
            ..LedgerConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn toml_roundtrip() {
        let c = LedgerConfig::for_root("/var/echo").with_policy(CorruptionPolicy::Skip);
        let text = c.to_toml_string().unwrap();
        assert_eq!(LedgerConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("echo.toml");
        fs::write(&path, "lock_timeout_ms = 250\n").unwrap();
        let c = LedgerConfig::load(&path).unwrap();
        assert_eq!(c.lock_timeout(), Duration::from_millis(250));

        let missing = LedgerConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, LedgerError::Config(_)));
    }
}
