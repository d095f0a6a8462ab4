//! Account, session and OAuth state storage.
//!
//! Flow Overview: handlers only see `Arc<dyn Store>`. The concrete backend is
//! picked from the DSN scheme at startup: `postgres://` for a real database,
//! `memory://` for a process-local store used in development and tests.
//!
//! Session and OAuth state lookups ignore expired rows; callers never need to
//! check expiry themselves.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use url::Url;
use uuid::Uuid;

use super::account::{Account, CreateOutcome};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// Backend name reported by `/health`.
    fn kind(&self) -> &'static str;

    async fn ping(&self) -> Result<()>;

    async fn create_local_account(&self, username: &str, password_hash: &str)
        -> Result<CreateOutcome>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>>;

    /// Return the account linked to `(provider, subject)`, creating it on first login.
    async fn find_or_create_federated(
        &self,
        provider: &str,
        subject: &str,
        display_name: Option<&str>,
    ) -> Result<Account>;

    /// Returns `false` when the account does not exist.
    async fn set_secret(&self, id: Uuid, secret: &str) -> Result<bool>;

    /// All published secrets, oldest account first.
    async fn list_secrets(&self) -> Result<Vec<String>>;

    async fn insert_session(&self, account_id: Uuid, token_hash: &[u8], ttl: Duration)
        -> Result<()>;

    async fn lookup_session(&self, token_hash: &[u8]) -> Result<Option<Uuid>>;

    async fn delete_session(&self, token_hash: &[u8]) -> Result<()>;

    async fn insert_oauth_state(&self, state: &str, pkce_verifier: &str, ttl: Duration)
        -> Result<()>;

    /// Consume a pending OAuth state, returning its PKCE verifier.
    async fn take_oauth_state(&self, state: &str) -> Result<Option<String>>;
}

/// Open the store named by `dsn`.
///
/// # Errors
/// Returns an error for unsupported schemes or when the database is unreachable.
pub async fn connect(dsn: &str) -> Result<Arc<dyn Store>> {
    let parsed = Url::parse(dsn).context("Invalid DSN")?;
    match parsed.scheme() {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        "postgres" | "postgresql" => {
            let store = PgStore::connect(dsn).await?;
            store.ensure_schema().await?;
            Ok(Arc::new(store))
        }
        other => Err(anyhow!(
            "Unsupported DSN scheme '{other}', expected postgres:// or memory://"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_memory_dsn() -> Result<()> {
        let store = connect("memory://").await?;
        assert_eq!(store.kind(), "memory");
        store.ping().await?;
        Ok(())
    }

    #[tokio::test]
    async fn connect_rejects_unknown_scheme() {
        let result = connect("mongodb://localhost:27017/userDB").await;
        assert!(result.is_err());
        if let Err(err) = result {
            assert!(err.to_string().contains("Unsupported DSN scheme 'mongodb'"));
        }
    }

    #[tokio::test]
    async fn connect_rejects_garbage() {
        assert!(connect("not a dsn").await.is_err());
    }
}
