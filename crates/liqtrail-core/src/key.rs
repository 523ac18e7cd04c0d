//! Position identification types.
//!
//! A trailing stop is scoped to one user holding one token. The pair forms
//! the primary key for the stop registry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the user owning a position (e.g. a chat or account id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
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

/// Identifier of the held token (e.g. a mint or contract address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub String);

impl TokenId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique position identifier combining user and token.
///
/// Format: `{user}:{token}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionKey {
    pub user: UserId,
    pub token: TokenId,
}

impl PositionKey {
    pub fn new(user: UserId, token: TokenId) -> Self {
        Self { user, token }
    }

    /// Create from raw user and token identifiers.
    pub fn from_ids(user_id: impl Into<String>, token_id: impl Into<String>) -> Self {
        Self {
            user: UserId::new(user_id),
            token: TokenId::new(token_id),
        }
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user, self.token)
    }
}
