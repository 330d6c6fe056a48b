//! Identifiers for lab sessions and students.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Identifier for one tracker session.
///
/// The value is the creation timestamp, so two sessions created within the
/// same instant may share an id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a SessionId from the current time.
    pub fn new() -> Self {
        Self(crate::time::now().to_rfc3339())
    }

    /// Get the raw string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Short random identifier for the student owning a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(String);

/// Length of a generated student id.
pub const STUDENT_ID_LEN: usize = 8;

impl StudentId {
    /// Generate a new StudentId from the random half of a ULID.
    pub fn new() -> Self {
        let ulid = Ulid::new().to_string().to_lowercase();
        Self(ulid[ulid.len() - STUDENT_ID_LEN..].to_string())
    }

    /// Get the raw string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StudentId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for StudentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for StudentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_id_is_short() {
        let id = StudentId::new();
        assert_eq!(id.as_str().len(), STUDENT_ID_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = StudentId::from("abc12345".to_string());
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc12345\"");

        let session: SessionId = serde_json::from_str("\"2024-05-01T10:00:00Z\"").unwrap();
        assert_eq!(session.as_str(), "2024-05-01T10:00:00Z");
    }
}
