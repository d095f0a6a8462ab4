//! # Confide
//!
//! `confide` is a small registration and login service that ships three
//! iterations of the same feature set: register, log in, view a protected
//! page and log out.
//!
//! ## Variants
//!
//! - **`hashing`:** salted Argon2id password hashes, no sessions. Every login
//!   re-verifies credentials and the protected page is rendered in the same
//!   response.
//! - **`federated`:** server-side sessions, a local username/password strategy
//!   and Google OAuth2 with find-or-create. Each account may publish one
//!   free-text secret; anyone can read the list, only the owner can write.
//! - **`session`:** sessions with the local strategy only, gating a static page.
//!
//! ## Sessions
//!
//! Session tokens are random, handed out in an `HttpOnly` cookie and stored
//! only as SHA-256 hashes. The session holds the account id; the account is
//! loaded again on every request.

pub mod cli;
pub mod confide;

pub const GIT_COMMIT_HASH: &str = confide::GIT_COMMIT_HASH;

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
