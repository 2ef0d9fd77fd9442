//! Accounts and the caregiver link between them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Identifier of a user account (as issued by the identity provider).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate and wrap an account identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyId`] when `id` is blank.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyId);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the identifier string.
    #[must_use]
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
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for UserId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// A bidirectional link between a monitored user and a caregiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountLink {
    a: UserId,
    b: UserId,
}

impl AccountLink {
    /// Link two distinct accounts.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::SelfLink`] when both sides are the same.
    pub fn new(a: UserId, b: UserId) -> Result<Self, ValidationError> {
        if a == b {
            return Err(ValidationError::SelfLink(a.0));
        }
        Ok(Self { a, b })
    }

    /// Both sides of the link.
    #[must_use]
    pub fn members(&self) -> (&UserId, &UserId) {
        (&self.a, &self.b)
    }
}
