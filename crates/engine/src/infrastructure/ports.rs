//! Port traits for infrastructure boundaries.
//!
//! Ports exist for:
//! - Account persistence (could swap SQLite -> anything transactional)
//! - Clock (for testing)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use delver_domain::Character;
use serde::{Deserialize, Serialize};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("No such user: {0}")]
    NoSuchUser(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    /// Database operation failed - includes operation name for tracing.
    #[error("Database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Password hashing failed: {0}")]
    Hash(String),
}

impl AccountError {
    pub fn database(operation: &'static str, message: impl ToString) -> Self {
        Self::Database {
            operation,
            message: message.to_string(),
        }
    }

    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }
}

// =============================================================================
// Infrastructure Types
// =============================================================================

/// A persisted player account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    /// PHC string; the plaintext password is never stored.
    pub password_hash: String,
    #[serde(default)]
    pub characters: Vec<Character>,
}

impl Account {
    pub fn character(&self, name: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.name == name)
    }

    pub fn character_names(&self) -> Vec<String> {
        self.characters.iter().map(|c| c.name.clone()).collect()
    }

    /// Replace the stored copy of a character, matched by name.
    pub fn store_character(&mut self, mut character: Character) {
        character.clear_transient();
        match self.characters.iter_mut().find(|c| c.name == character.name) {
            Some(existing) => *existing = character,
            None => self.characters.push(character),
        }
    }

    pub fn remove_character(&mut self, name: &str) -> Option<Character> {
        let index = self.characters.iter().position(|c| c.name == name)?;
        Some(self.characters.remove(index))
    }
}

// =============================================================================
// Ports
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn account(&self, username: &str) -> Result<Account, AccountError>;
    /// Hashes the password before anything is written.
    async fn new_account(&self, username: &str, password: &str) -> Result<(), AccountError>;
    /// Strips per-tick character state before writing.
    async fn save_account(&self, account: &Account) -> Result<(), AccountError>;
    /// Runs the hash check off the async runtime.
    async fn verify_password(&self, account: &Account, password: &str) -> bool;
    /// Names of the store's tables, for diagnostics.
    async fn buckets(&self) -> Result<Vec<String>, AccountError>;
    /// Keys held in one table, for diagnostics.
    async fn list_bucket(&self, bucket: &str) -> Result<Vec<String>, AccountError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[cfg(test)]
mod tests {
    use delver_domain::{Desire, Namespaces, Wid};

    use super::*;

    #[test]
    fn store_character_replaces_by_name_and_drops_tick_state() {
        let ns = Namespaces::default();
        let catalog = delver_domain::Catalog::new();
        let mut account = Account {
            username: "ana".into(),
            password_hash: String::new(),
            characters: vec![Character::new("Ana", ns.content_id("character:fighter"), &catalog)],
        };

        let mut updated = account.characters[0].clone();
        updated.health = 3;
        updated.desire = Some(Desire::Bash { wid: Wid::new(1) });
        account.store_character(updated);

        assert_eq!(account.characters.len(), 1);
        assert_eq!(account.characters[0].health, 3);
        assert!(account.characters[0].desire.is_none());
        assert_eq!(account.character_names(), vec!["Ana".to_string()]);
        assert!(account.remove_character("Ana").is_some());
        assert!(account.character("Ana").is_none());
    }
}
