use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Identity used to namespace a user's tasks and playback tokens.
///
/// Passed explicitly to whatever needs it; the session clock never sees it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: &str) -> Result<Self, ValidationError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(ValidationError::Empty("user_id".into()));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_rejects_blank() {
        assert_eq!(UserId::new(" ada ").unwrap().as_str(), "ada");
        assert!(UserId::new("   ").is_err());
    }
}
