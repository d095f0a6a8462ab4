//! Process-local store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::Store;
use crate::confide::account::{Account, CreateOutcome};

struct Expiring<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Expiring<T> {
    fn new(value: T, ttl: Duration) -> Result<Self> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .context("expiry is out of range")?;
        Ok(Self { value, expires_at })
    }

    fn is_live(&self) -> bool {
        self.expires_at > Instant::now()
    }
}

#[derive(Default)]
struct Inner {
    // insertion order doubles as creation order for `list_secrets`
    accounts: Vec<Account>,
    sessions: HashMap<Vec<u8>, Expiring<Uuid>>,
    oauth_states: HashMap<String, Expiring<String>>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn create_local_account(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<CreateOutcome> {
        let mut inner = self.inner.lock().await;
        if inner
            .accounts
            .iter()
            .any(|account| account.username.as_deref() == Some(username))
        {
            return Ok(CreateOutcome::Conflict);
        }
        let account = Account::new_local(username.to_string(), password_hash.to_string());
        inner.accounts.push(account.clone());
        Ok(CreateOutcome::Created(account))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .accounts
            .iter()
            .find(|account| account.username.as_deref() == Some(username))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let inner = self.inner.lock().await;
        Ok(inner.accounts.iter().find(|account| account.id == id).cloned())
    }

    async fn find_or_create_federated(
        &self,
        provider: &str,
        subject: &str,
        display_name: Option<&str>,
    ) -> Result<Account> {
        let mut inner = self.inner.lock().await;
        if let Some(existing) = inner.accounts.iter_mut().find(|account| {
            account.provider.as_deref() == Some(provider)
                && account.provider_subject.as_deref() == Some(subject)
        }) {
            if let Some(name) = display_name {
                existing.display_name = Some(name.to_string());
            }
            return Ok(existing.clone());
        }
        let account = Account::new_federated(provider, subject, display_name);
        inner.accounts.push(account.clone());
        Ok(account)
    }

    async fn set_secret(&self, id: Uuid, secret: &str) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        match inner.accounts.iter_mut().find(|account| account.id == id) {
            Some(account) => {
                account.secret = Some(secret.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_secrets(&self) -> Result<Vec<String>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .accounts
            .iter()
            .filter_map(|account| account.secret.clone())
            .collect())
    }

    async fn insert_session(
        &self,
        account_id: Uuid,
        token_hash: &[u8],
        ttl: Duration,
    ) -> Result<()> {
        let session = Expiring::new(account_id, ttl)?;
        let mut inner = self.inner.lock().await;
        inner.sessions.retain(|_, session| session.is_live());
        inner.sessions.insert(token_hash.to_vec(), session);
        Ok(())
    }

    async fn lookup_session(&self, token_hash: &[u8]) -> Result<Option<Uuid>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .sessions
            .get(token_hash)
            .filter(|session| session.is_live())
            .map(|session| session.value))
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<()> {
        self.inner.lock().await.sessions.remove(token_hash);
        Ok(())
    }

    async fn insert_oauth_state(
        &self,
        state: &str,
        pkce_verifier: &str,
        ttl: Duration,
    ) -> Result<()> {
        let pending = Expiring::new(pkce_verifier.to_string(), ttl)?;
        let mut inner = self.inner.lock().await;
        inner.oauth_states.retain(|_, pending| pending.is_live());
        inner.oauth_states.insert(state.to_string(), pending);
        Ok(())
    }

    async fn take_oauth_state(&self, state: &str) -> Result<Option<String>> {
        let mut inner = self.inner.lock().await;
        Ok(inner
            .oauth_states
            .remove(state)
            .filter(Expiring::is_live)
            .map(|pending| pending.value))
    }
}
