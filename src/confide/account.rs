//! Account model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A registered (local) or federated user record.
///
/// Local accounts carry a `username` and `password_hash`; federated accounts
/// carry a `provider` + `provider_subject` pair instead.
#[derive(Clone, Debug, FromRow, Serialize)]
pub struct Account {
    pub id: Uuid,
    pub username: Option<String>,
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub provider: Option<String>,
    pub provider_subject: Option<String>,
    pub display_name: Option<String>,
    pub secret: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    #[must_use]
    pub fn new_local(username: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: Some(username),
            password_hash: Some(password_hash),
            provider: None,
            provider_subject: None,
            display_name: None,
            secret: None,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn new_federated(provider: &str, subject: &str, display_name: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: None,
            password_hash: None,
            provider: Some(provider.to_string()),
            provider_subject: Some(subject.to_string()),
            display_name: display_name.map(ToString::to_string),
            secret: None,
            created_at: Utc::now(),
        }
    }
}

/// Outcome when registering a local account.
#[derive(Debug)]
pub enum CreateOutcome {
    Created(Account),
    Conflict,
}
