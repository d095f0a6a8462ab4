//! Postgres-backed store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Connection, PgPool, Row};
use std::time::Duration;
use tracing::{info_span, Instrument, Span};
use uuid::Uuid;

use super::Store;
use crate::confide::{
    account::{Account, CreateOutcome},
    state::MAX_TTL_SECONDS,
};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const ACCOUNT_COLUMNS: &str =
    "id, username, password_hash, provider, provider_subject, display_name, secret, created_at";

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect a bounded pool.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        Ok(Self { pool })
    }

    /// Create tables and indexes when missing.
    ///
    /// # Errors
    /// Returns an error if any schema statement fails.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .instrument(info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "CREATE"
            ))
            .await
            .context("failed to apply schema")?;
        Ok(())
    }
}

fn query_span(operation: &'static str, statement: &str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn ttl_seconds(ttl: Duration) -> Result<i64> {
    let seconds = ttl.as_secs();
    if seconds > MAX_TTL_SECONDS {
        anyhow::bail!("TTL of {seconds}s exceeds the {MAX_TTL_SECONDS}s limit");
    }
    i64::try_from(seconds).context("TTL is out of range")
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl Store for PgStore {
    fn kind(&self) -> &'static str {
        "postgresql"
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .instrument(info_span!(
                "db.acquire",
                db.system = "postgresql",
                db.operation = "ACQUIRE"
            ))
            .await
            .context("failed to acquire database connection")?;
        conn.ping()
            .instrument(info_span!(
                "db.ping",
                db.system = "postgresql",
                db.operation = "PING"
            ))
            .await
            .context("failed to ping database")?;
        Ok(())
    }

    async fn create_local_account(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<CreateOutcome> {
        let query = format!(
            "INSERT INTO accounts (id, username, password_hash) VALUES ($1, $2, $3) RETURNING {ACCOUNT_COLUMNS}"
        );
        let result = sqlx::query_as::<_, Account>(&query)
            .bind(Uuid::new_v4())
            .bind(username)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", &query))
            .await;

        match result {
            Ok(account) => Ok(CreateOutcome::Created(account)),
            Err(err) if is_unique_violation(&err) => Ok(CreateOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert account"),
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = $1");
        sqlx::query_as::<_, Account>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to lookup account by username")
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to lookup account by id")
    }

    async fn find_or_create_federated(
        &self,
        provider: &str,
        subject: &str,
        display_name: Option<&str>,
    ) -> Result<Account> {
        // Upsert keeps concurrent first logins from racing into a unique violation.
        let query = format!(
            r"
            INSERT INTO accounts (id, provider, provider_subject, display_name)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (provider, provider_subject)
            DO UPDATE SET display_name = COALESCE(EXCLUDED.display_name, accounts.display_name)
            RETURNING {ACCOUNT_COLUMNS}
            "
        );
        sqlx::query_as::<_, Account>(&query)
            .bind(Uuid::new_v4())
            .bind(provider)
            .bind(subject)
            .bind(display_name)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", &query))
            .await
            .context("failed to find or create federated account")
    }

    async fn set_secret(&self, id: Uuid, secret: &str) -> Result<bool> {
        let query = "UPDATE accounts SET secret = $2 WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .bind(secret)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to update secret")?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_secrets(&self) -> Result<Vec<String>> {
        let query = "SELECT secret FROM accounts WHERE secret IS NOT NULL ORDER BY created_at, id";
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to list secrets")?;
        Ok(rows.iter().map(|row| row.get::<String, _>("secret")).collect())
    }

    async fn insert_session(
        &self,
        account_id: Uuid,
        token_hash: &[u8],
        ttl: Duration,
    ) -> Result<()> {
        let ttl = ttl_seconds(ttl)?;
        // Expired sessions are swept on every login.
        let query = r"
            WITH purged AS (
                DELETE FROM sessions WHERE expires_at <= NOW()
            )
            INSERT INTO sessions (session_hash, account_id, expires_at)
            VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
        ";
        sqlx::query(query)
            .bind(token_hash)
            .bind(account_id)
            .bind(ttl)
            .execute(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .context("failed to insert session")?;
        Ok(())
    }

    async fn lookup_session(&self, token_hash: &[u8]) -> Result<Option<Uuid>> {
        let query = r"
            SELECT account_id
            FROM sessions
            WHERE session_hash = $1
              AND expires_at > NOW()
            LIMIT 1
        ";
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup session")?;
        Ok(row.map(|row| row.get("account_id")))
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<()> {
        // Logout is idempotent; it's fine if no rows are deleted.
        let query = "DELETE FROM sessions WHERE session_hash = $1";
        sqlx::query(query)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await
            .context("failed to delete session")?;
        Ok(())
    }

    async fn insert_oauth_state(
        &self,
        state: &str,
        pkce_verifier: &str,
        ttl: Duration,
    ) -> Result<()> {
        let ttl = ttl_seconds(ttl)?;
        // Abandoned authorizations never reach the callback, sweep them here.
        let query = r"
            WITH purged AS (
                DELETE FROM oauth_states WHERE expires_at <= NOW()
            )
            INSERT INTO oauth_states (state, pkce_verifier, expires_at)
            VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
        ";
        sqlx::query(query)
            .bind(state)
            .bind(pkce_verifier)
            .bind(ttl)
            .execute(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .context("failed to insert oauth state")?;
        Ok(())
    }

    async fn take_oauth_state(&self, state: &str) -> Result<Option<String>> {
        // Delete-and-return in one statement so a state can only be used once.
        let query = r"
            DELETE FROM oauth_states
            WHERE state = $1 AND expires_at > NOW()
            RETURNING pkce_verifier
        ";
        let row = sqlx::query(query)
            .bind(state)
            .fetch_optional(&self.pool)
            .instrument(query_span("DELETE", query))
            .await
            .context("failed to take oauth state")?;
        Ok(row.map(|row| row.get("pkce_verifier")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_seconds_rejects_oversized_values() -> Result<()> {
        assert_eq!(ttl_seconds(Duration::from_secs(600))?, 600);
        assert_eq!(
            ttl_seconds(Duration::from_secs(MAX_TTL_SECONDS))?,
            i64::try_from(MAX_TTL_SECONDS)?
        );
        assert!(ttl_seconds(Duration::from_secs(MAX_TTL_SECONDS + 1)).is_err());
        assert!(ttl_seconds(Duration::from_secs(u64::MAX)).is_err());
        Ok(())
    }

    #[test]
    fn schema_creates_all_tables() {
        for table in ["accounts", "sessions", "oauth_states"] {
            assert!(
                SCHEMA_SQL.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")),
                "schema is missing table {table}"
            );
        }
    }

    #[test]
    fn non_database_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
