use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest identifier accepted from the caller.
pub const MAX_USER_ID_LEN: usize = 150;

/// Identity of the authenticated user a booking belongs to.
///
/// The value is opaque to the booking core: it is whatever the presentation
/// layer resolved the caller to. Only its shape is checked here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidUserId {
    #[error("User id must not be empty")]
    Empty,

    #[error("User id exceeds {max} characters")]
    TooLong { max: usize },

    #[error("User id contains whitespace or control characters")]
    IllegalCharacter,
}

impl UserId {
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidUserId> {
        let raw = raw.into();

        if raw.is_empty() {
            return Err(InvalidUserId::Empty);
        }
        if raw.chars().count() > MAX_USER_ID_LEN {
            return Err(InvalidUserId::TooLong { max: MAX_USER_ID_LEN });
        }
        if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(InvalidUserId::IllegalCharacter);
        }

        Ok(Self(raw))
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

impl FromStr for UserId {
    type Err = InvalidUserId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for UserId {
    type Error = InvalidUserId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_usernames_and_emails() {
        assert_eq!(UserId::new("testuser").unwrap().as_str(), "testuser");
        assert!(UserId::new("test@example.com").is_ok());
    }

    #[test]
    fn test_rejects_malformed_ids() {
        assert_eq!(UserId::new(""), Err(InvalidUserId::Empty));
        assert_eq!(UserId::new("two words"), Err(InvalidUserId::IllegalCharacter));
        assert_eq!(
            UserId::new("x".repeat(MAX_USER_ID_LEN + 1)),
            Err(InvalidUserId::TooLong { max: MAX_USER_ID_LEN })
        );
    }

    #[test]
    fn test_deserialization_validates() {
        let ok: UserId = serde_json::from_str(r#""alice""#).unwrap();
        assert_eq!(ok.to_string(), "alice");
        assert!(serde_json::from_str::<UserId>(r#""""#).is_err());
    }
}
