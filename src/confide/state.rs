//! Auth configuration and shared request state.

use std::sync::Arc;

use super::{oauth::IdentityProvider, pages::Pages, variant::Variant};

const DEFAULT_SESSION_TTL_SECONDS: u64 = 24 * 60 * 60;
const DEFAULT_OAUTH_STATE_TTL_SECONDS: u64 = 10 * 60;

/// Upper bound for every TTL (one year), keeps expiry arithmetic in range.
pub const MAX_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    base_url: String,
    session_ttl_seconds: u64,
    oauth_state_ttl_seconds: u64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            oauth_state_ttl_seconds: DEFAULT_OAUTH_STATE_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds.min(MAX_TTL_SECONDS);
        self
    }

    #[must_use]
    pub fn with_oauth_state_ttl_seconds(mut self, seconds: u64) -> Self {
        self.oauth_state_ttl_seconds = seconds.min(MAX_TTL_SECONDS);
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> u64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn oauth_state_ttl_seconds(&self) -> u64 {
        self.oauth_state_ttl_seconds
    }

    /// Only mark cookies secure when the site is served over HTTPS.
    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Default Google callback: `<base-url>/auth/google/secrets`.
    #[must_use]
    pub fn default_google_callback_url(&self) -> String {
        format!("{}/auth/google/secrets", self.base_url.trim_end_matches('/'))
    }
}

pub struct AuthState {
    config: AuthConfig,
    variant: Variant,
    pages: Pages,
    provider: Option<Arc<dyn IdentityProvider>>,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        variant: Variant,
        pages: Pages,
        provider: Option<Arc<dyn IdentityProvider>>,
    ) -> Self {
        Self {
            config,
            variant,
            pages,
            provider,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn variant(&self) -> Variant {
        self.variant
    }

    #[must_use]
    pub fn pages(&self) -> &Pages {
        &self.pages
    }

    /// Federated login provider, only present for the federated variant.
    #[must_use]
    pub fn provider(&self) -> Option<&Arc<dyn IdentityProvider>> {
        self.provider.as_ref()
    }
}
