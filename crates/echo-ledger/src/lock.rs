use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{io_at, LedgerError, Result};

const RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Exclusive advisory lock on a ledger, held by whoever created the lock
/// file.
///
/// The lock file is created with `create_new`, so at most one writer holds
/// it at a time; it carries the holder's process id for diagnostics and is
/// removed when the guard drops. A lock left behind by a crashed process
/// has to be removed by hand; the timeout error names its path.
#[derive(Debug)]
pub struct LedgerLock {
    path: PathBuf,
}

impl LedgerLock {
    /// Acquire the lock, retrying until `timeout` elapses.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self> {
        let started = Instant::now();
        let mut contended = false;

        loop {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut file) => {
                    if let Err(e) = writeln!(file, "{}", std::process::id()) {
                        warn!(path = %path.display(), error = %e, "could not record lock holder");
                    }
                    debug!(
                        path = %path.display(),
                        waited_ms = started.elapsed().as_millis() as u64,
                        "ledger lock acquired"
                    );
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    let waited = started.elapsed();
                    if waited >= timeout {
                        return Err(LedgerError::LockTimeout {
                            path: path.to_path_buf(),
                            waited_ms: waited.as_millis() as u64,
                        });
                    }
                    if !contended {
                        debug!(path = %path.display(), "ledger lock held elsewhere; waiting");
                        contended = true;
                    }
                    thread::sleep(RETRY_INTERVAL);
                }
                Err(e) => return Err(io_at(path)(e)),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LedgerLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to release ledger lock");
        }
    }
}
