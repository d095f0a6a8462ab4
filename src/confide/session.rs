//! Server-side sessions carried by an `HttpOnly` cookie.
//!
//! Flow Overview:
//! - Login serializes the account id into a new session row and hands the raw
//!   token to the browser.
//! - Every request deserializes it again: cookie -> token hash -> session row
//!   -> account.
//! - Logout deletes the row and clears the cookie.
//!
//! Only the SHA-256 hash of a token is stored; raw tokens never touch the store.

use anyhow::{Context, Result};
use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::time::Duration;
use uuid::Uuid;

use super::{account::Account, state::AuthConfig, store::Store};

pub const SESSION_COOKIE_NAME: &str = "confide_session";

/// Create a new session token for the auth cookie.
pub(crate) fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

pub(crate) fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Build the `Set-Cookie` value for a fresh session token.
pub(crate) fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    // Browsers may send several Cookie headers; check them all.
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            let val = val.trim();
            if key.trim() == SESSION_COOKIE_NAME && !val.is_empty() {
                return Some(val.to_string());
            }
        }
    }
    None
}

/// Persist a session for `account_id` and return the cookie to set.
///
/// # Errors
/// Returns an error if the token cannot be generated, stored or encoded.
pub async fn start_session(
    store: &dyn Store,
    config: &AuthConfig,
    account_id: Uuid,
) -> Result<HeaderValue> {
    let token = generate_session_token()?;
    let ttl = Duration::from_secs(config.session_ttl_seconds());
    store
        .insert_session(account_id, &hash_session_token(&token), ttl)
        .await?;
    session_cookie(config, &token).context("failed to build session cookie")
}

/// Resolve the session cookie into an account.
///
/// Returns `Ok(None)` when the cookie is missing, unknown or expired, or when
/// the account behind it no longer exists.
///
/// # Errors
/// Returns an error only when the store fails.
pub async fn current_account(headers: &HeaderMap, store: &dyn Store) -> Result<Option<Account>> {
    let Some(token) = extract_session_token(headers) else {
        return Ok(None);
    };
    let Some(account_id) = store.lookup_session(&hash_session_token(&token)).await? else {
        return Ok(None);
    };
    store.find_by_id(account_id).await
}

/// Delete the session (if any) and return a cookie that clears it.
///
/// The cookie is cleared even when the store fails, so the error is only logged
/// by the caller.
pub async fn end_session(
    headers: &HeaderMap,
    store: &dyn Store,
    config: &AuthConfig,
) -> (Option<HeaderValue>, Result<()>) {
    let result = match extract_session_token(headers) {
        Some(token) => store.delete_session(&hash_session_token(&token)).await,
        None => Ok(()),
    };
    (clear_session_cookie(config).ok(), result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confide::store::MemoryStore;

    fn config(base_url: &str) -> AuthConfig {
        AuthConfig::new(base_url.to_string()).with_session_ttl_seconds(120)
    }

    fn cookie_headers(value: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(value)?);
        Ok(headers)
    }

    #[test]
    fn tokens_are_random_and_url_safe() -> Result<()> {
        let first = generate_session_token()?;
        let second = generate_session_token()?;
        assert_ne!(first, second);
        // 32 bytes -> 43 unpadded base64 characters
        assert_eq!(first.len(), 43);
        assert!(first
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        Ok(())
    }

    #[test]
    fn hash_is_sha256() {
        let hash = hash_session_token("token");
        assert_eq!(hash.len(), 32);
        assert_eq!(hash, hash_session_token("token"));
        assert_ne!(hash, hash_session_token("other"));
    }

    #[test]
    fn cookie_is_secure_only_over_https() -> Result<()> {
        let plain = session_cookie(&config("http://localhost:3000"), "abc")?;
        let plain = plain.to_str()?;
        assert!(plain.starts_with("confide_session=abc; Path=/; HttpOnly; SameSite=Lax"));
        assert!(plain.contains("Max-Age=120"));
        assert!(!plain.contains("Secure"));

        let secure = session_cookie(&config("https://confide.dev"), "abc")?;
        assert!(secure.to_str()?.ends_with("; Secure"));
        Ok(())
    }

    #[test]
    fn clear_cookie_expires_immediately() -> Result<()> {
        let cleared = clear_session_cookie(&config("http://localhost:3000"))?;
        assert!(cleared.to_str()?.contains("confide_session=; "));
        assert!(cleared.to_str()?.contains("Max-Age=0"));
        Ok(())
    }

    #[test]
    fn extract_finds_session_among_other_cookies() -> Result<()> {
        let headers = cookie_headers("theme=dark; confide_session=tok123; lang=en")?;
        assert_eq!(extract_session_token(&headers).as_deref(), Some("tok123"));
        Ok(())
    }

    #[test]
    fn extract_ignores_missing_or_empty() -> Result<()> {
        assert_eq!(extract_session_token(&HeaderMap::new()), None);
        assert_eq!(
            extract_session_token(&cookie_headers("confide_session=")?),
            None
        );
        assert_eq!(extract_session_token(&cookie_headers("garbage")?), None);
        Ok(())
    }

    #[tokio::test]
    async fn session_lifecycle_round_trips_account() -> Result<()> {
        let store = MemoryStore::new();
        let config = config("http://localhost:3000");
        let account = store
            .find_or_create_federated("google", "sub-1", Some("Alice"))
            .await?;

        let cookie = start_session(&store, &config, account.id).await?;
        let token = cookie
            .to_str()?
            .split(';')
            .next()
            .and_then(|pair| pair.strip_prefix("confide_session="))
            .map(ToString::to_string)
            .context("cookie should carry the token")?;
        let headers = cookie_headers(&format!("confide_session={token}"))?;

        let resolved = current_account(&headers, &store).await?;
        assert_eq!(resolved.map(|a| a.id), Some(account.id));

        let (cleared, result) = end_session(&headers, &store, &config).await;
        result?;
        assert!(cleared.is_some());
        assert!(current_account(&headers, &store).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn unknown_token_is_anonymous() -> Result<()> {
        let store = MemoryStore::new();
        let headers = cookie_headers("confide_session=never-issued")?;
        assert!(current_account(&headers, &store).await?.is_none());
        Ok(())
    }
}
