//! Typed ID wrappers.
//!
//! Newtypes around UUIDs so a job identifier cannot be handed out where a
//! diagnostic-log identifier is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generate a new random job ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for JobId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a diagnostic log written for a failed or timed-out job.
///
/// The short form (first eight hex digits) names the log file on disk and is
/// what callers are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagnosticId(Uuid);

impl DiagnosticId {
    /// Generate a new random diagnostic ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits of the UUID.
    #[must_use]
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }

    /// File name of the log written for this ID.
    #[must_use]
    pub fn log_file_name(&self) -> String {
        format!("log_{}.txt", self.short())
    }
}

impl Default for DiagnosticId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for DiagnosticId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl std::fmt::Display for DiagnosticId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Short random hex token of the given length (at most 32).
///
/// Used for store-issued upload names and synthesized output names.
#[must_use]
pub fn short_hex(len: usize) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..len.min(hex.len())].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_unique() {
        assert_ne!(JobId::new(), JobId::new());
    }

    #[test]
    fn test_diagnostic_log_name() {
        let uuid = Uuid::parse_str("4032e363-1edb-ed8e-fbfb-abf97b5312d7").unwrap();
        let id = DiagnosticId::from(uuid);
        assert_eq!(id.short(), "4032e363");
        assert_eq!(id.log_file_name(), "log_4032e363.txt");
    }

    #[test]
    fn test_id_serde_transparent() {
        let uuid = Uuid::new_v4();
        let id = JobId::from(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid));
    }

    #[test]
    fn test_short_hex() {
        let token = short_hex(10);
        assert_eq!(token.len(), 10);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(short_hex(64).len(), 32);
    }
}
