use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::timestamp::Timestamp;

/// Context key under which an entry records the session that wrote it.
pub const SESSION_CONTEXT_KEY: &str = "session_id";

/// Identifies one working session of whoever is writing to the ledger.
///
/// Fresh ids are the UTC start time at second precision,
/// `YYYYMMDD_HHMMSS`, which also sorts chronologically.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// A new id derived from the current time.
    pub fn start() -> Self {
        Self::from_start_time(Timestamp::now())
    }

    pub fn from_start_time(started: Timestamp) -> Self {
        Self(started.as_datetime().format("%Y%m%d_%H%M%S").to_string())
    }

    /// Use a caller-chosen id. Blank ids are rejected.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(TypeError::InvalidSessionId(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
