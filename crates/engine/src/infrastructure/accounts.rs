//! SQLite-backed account store.
//!
//! Accounts are JSON documents keyed by username in a single `accounts` table.
//! Every operation runs in its own transaction.

use argon2::Argon2;
use async_trait::async_trait;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use sqlx::{Row, SqlitePool};

use crate::infrastructure::ports::{Account, AccountError, AccountStore};

pub struct SqliteAccountStore {
    pool: SqlitePool,
}

impl SqliteAccountStore {
    pub async fn new(db_path: &str) -> Result<Self, AccountError> {
        let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", db_path))
            .await
            .map_err(|e| AccountError::database("open", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| AccountError::database("open", e))?;

        Ok(Self { pool })
    }
}

fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut password_hash::rand_core::OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AccountError::Hash(e.to_string()))
}

#[async_trait]
impl AccountStore for SqliteAccountStore {
    async fn account(&self, username: &str) -> Result<Account, AccountError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AccountError::database("account", e))?;
        let row = sqlx::query("SELECT value FROM accounts WHERE key = ?")
            .bind(username)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AccountError::database("account", e))?;
        tx.commit()
            .await
            .map_err(|e| AccountError::database("account", e))?;

        let row = row.ok_or_else(|| AccountError::NoSuchUser(username.to_string()))?;
        let json: String = row.get("value");
        serde_json::from_str(&json).map_err(AccountError::serialization)
    }

    async fn new_account(&self, username: &str, password: &str) -> Result<(), AccountError> {
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AccountError::Hash(e.to_string()))??;
        let account = Account {
            username: username.to_string(),
            password_hash,
            characters: Vec::new(),
        };
        let json = serde_json::to_string(&account).map_err(AccountError::serialization)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AccountError::database("new_account", e))?;
        let existing = sqlx::query("SELECT 1 FROM accounts WHERE key = ?")
            .bind(username)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AccountError::database("new_account", e))?;
        if existing.is_some() {
            return Err(AccountError::UserExists(username.to_string()));
        }
        sqlx::query("INSERT INTO accounts (key, value) VALUES (?, ?)")
            .bind(username)
            .bind(json)
            .execute(&mut *tx)
            .await
            .map_err(|e| AccountError::database("new_account", e))?;
        tx.commit()
            .await
            .map_err(|e| AccountError::database("new_account", e))?;

        tracing::info!(username = %username, "Account created");
        Ok(())
    }

    async fn save_account(&self, account: &Account) -> Result<(), AccountError> {
        let mut stored = account.clone();
        for character in &mut stored.characters {
            character.clear_transient();
        }
        let json = serde_json::to_string(&stored).map_err(AccountError::serialization)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AccountError::database("save_account", e))?;
        sqlx::query(
            r#"
            INSERT INTO accounts (key, value)
            VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(&stored.username)
        .bind(json)
        .execute(&mut *tx)
        .await
        .map_err(|e| AccountError::database("save_account", e))?;
        tx.commit()
            .await
            .map_err(|e| AccountError::database("save_account", e))?;
        Ok(())
    }

    async fn verify_password(&self, account: &Account, password: &str) -> bool {
        let username = account.username.clone();
        let password_hash = account.password_hash.clone();
        let password = password.to_string();
        let verified = tokio::task::spawn_blocking(move || {
            let Ok(parsed) = PasswordHash::new(&password_hash) else {
                tracing::warn!(username = %username, "Bad password hash format");
                return false;
            };
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .await;
        verified.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Password verification task failed");
            false
        })
    }

    async fn buckets(&self) -> Result<Vec<String>, AccountError> {
        let rows = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AccountError::database("buckets", e))?;
        Ok(rows.iter().map(|row| row.get("name")).collect())
    }

    async fn list_bucket(&self, bucket: &str) -> Result<Vec<String>, AccountError> {
        // Table names cannot be bound, so only known tables are queried.
        if !self.buckets().await?.iter().any(|b| b == bucket) {
            return Err(AccountError::database(
                "list_bucket",
                format!("unknown bucket {bucket}"),
            ));
        }
        let rows = sqlx::query(&format!("SELECT key FROM \"{bucket}\" ORDER BY key"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AccountError::database("list_bucket", e))?;
        Ok(rows.iter().map(|row| row.get("key")).collect())
    }
}
