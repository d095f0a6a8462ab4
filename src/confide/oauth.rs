//! # Federated login (OAuth 2.0 authorization code flow with PKCE)
//!
//! [`IdentityProvider`] is the seam between the HTTP handlers and a concrete
//! provider. The handlers own the state bookkeeping (pending states live in the
//! store); providers only build authorization URLs and turn a code into a
//! [`FederatedProfile`].
//!
//! [`GoogleProvider`] requests the `profile` scope and reads the stable subject
//! (`sub`) from Google's OpenID userinfo endpoint.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope,
    TokenResponse, TokenUrl,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::APP_USER_AGENT;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

/// Where to send the browser, plus what must be remembered until the callback.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub pkce_verifier: String,
}

/// Identity returned by a provider after a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedProfile {
    pub subject: String,
    pub display_name: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Provider name stored alongside the subject, e.g. `google`.
    fn name(&self) -> &'static str;

    fn authorize(&self) -> AuthorizationRequest;

    async fn exchange(&self, code: &str, pkce_verifier: &str) -> Result<FederatedProfile>;
}

#[derive(Debug)]
pub struct GoogleConfig {
    client_id: String,
    client_secret: SecretString,
    callback_url: String,
    auth_url: String,
    token_url: String,
    userinfo_url: String,
}

impl GoogleConfig {
    #[must_use]
    pub fn new(client_id: String, client_secret: SecretString, callback_url: String) -> Self {
        Self {
            client_id,
            client_secret,
            callback_url,
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_auth_url(mut self, url: String) -> Self {
        self.auth_url = url;
        self
    }

    #[must_use]
    pub fn with_token_url(mut self, url: String) -> Self {
        self.token_url = url;
        self
    }

    #[must_use]
    pub fn with_userinfo_url(mut self, url: String) -> Self {
        self.userinfo_url = url;
        self
    }

    #[must_use]
    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    name: Option<String>,
}

/// OAuth client type with auth URL and token URL set.
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

pub struct GoogleProvider {
    client: ConfiguredClient,
    http: reqwest::Client,
    userinfo_url: String,
}

impl GoogleProvider {
    /// Build the provider, validating every configured URL up front.
    ///
    /// # Errors
    /// Returns an error if a URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &GoogleConfig) -> Result<Self> {
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(
                config.client_secret.expose_secret().to_string(),
            ))
            .set_auth_uri(AuthUrl::new(config.auth_url.clone()).context("Invalid OAuth auth URL")?)
            .set_token_uri(
                TokenUrl::new(config.token_url.clone()).context("Invalid OAuth token URL")?,
            )
            .set_redirect_uri(
                RedirectUrl::new(config.callback_url.clone())
                    .context("Invalid OAuth callback URL")?,
            );

        // The token endpoint must not be followed through redirects.
        let http = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to build OAuth HTTP client")?;

        Ok(Self {
            client,
            http,
            userinfo_url: config.userinfo_url.clone(),
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    fn authorize(&self) -> AuthorizationRequest {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (url, state) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("profile".to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        AuthorizationRequest {
            url: url.to_string(),
            state: state.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
        }
    }

    async fn exchange(&self, code: &str, pkce_verifier: &str) -> Result<FederatedProfile> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| anyhow!("token exchange failed: {e}"))?;

        let user: GoogleUserInfo = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(token.access_token().secret())
            .send()
            .await
            .context("failed to fetch Google profile")?
            .error_for_status()
            .context("Google userinfo request was rejected")?
            .json()
            .await
            .context("invalid Google profile payload")?;

        debug!("google profile subject: {}", user.sub);

        Ok(FederatedProfile {
            subject: user.sub,
            display_name: user.name,
        })
    }
}
