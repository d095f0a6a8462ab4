use crate::cli::commands::google::Credentials;
use crate::confide::{
    self,
    oauth::{GoogleConfig, GoogleProvider, IdentityProvider},
    pages::Pages,
    state::{AuthConfig, AuthState},
    store,
    variant::Variant,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub variant: Variant,
    pub base_url: String,
    pub session_ttl_seconds: u64,
    pub oauth_state_ttl_seconds: u64,
    pub google: Option<Credentials>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the store cannot be reached, the OAuth client cannot be
/// built, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let config = AuthConfig::new(args.base_url)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_oauth_state_ttl_seconds(args.oauth_state_ttl_seconds);

    let provider = identity_provider(args.variant, &config, args.google)?;

    let store = store::connect(&args.dsn).await?;
    info!("Using {} store", store.kind());

    let pages = Pages::new(args.variant, provider.is_some())?;

    let auth_state = Arc::new(AuthState::new(config, args.variant, pages, provider));

    confide::new(args.port, auth_state, store).await
}

fn identity_provider(
    variant: Variant,
    config: &AuthConfig,
    google: Option<Credentials>,
) -> Result<Option<Arc<dyn IdentityProvider>>> {
    if !variant.federated_login() {
        if google.is_some() {
            debug!("Google credentials ignored by the {} variant", variant);
        }
        return Ok(None);
    }

    let Some(credentials) = google else {
        warn!("No Google client id configured, \"Sign in with Google\" is disabled");
        return Ok(None);
    };

    let callback_url = credentials
        .callback_url
        .unwrap_or_else(|| config.default_google_callback_url());

    let google_config =
        GoogleConfig::new(credentials.client_id, credentials.client_secret, callback_url);

    debug!("Google callback URL: {}", google_config.callback_url());

    let provider: Arc<dyn IdentityProvider> = Arc::new(
        GoogleProvider::new(&google_config).context("Invalid Google OAuth settings")?,
    );

    Ok(Some(provider))
}

fn log_startup_args(args: &Args) {
    let dsn = Url::parse(&args.dsn).map_or_else(
        |_| "<unparseable>".to_string(),
        |mut url| {
            if url.password().is_some() {
                let _ = url.set_password(Some("***"));
            }
            url.to_string()
        },
    );

    debug!(
        port = args.port,
        dsn = %dsn,
        variant = %args.variant,
        base_url = %args.base_url,
        session_ttl_seconds = args.session_ttl_seconds,
        oauth_state_ttl_seconds = args.oauth_state_ttl_seconds,
        google = args.google.is_some(),
        "Server startup arguments"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn credentials(callback_url: Option<&str>) -> Credentials {
        Credentials {
            client_id: "client-id".to_string(),
            client_secret: SecretString::from("client-secret".to_string()),
            callback_url: callback_url.map(ToString::to_string),
        }
    }

    #[test]
    fn provider_only_for_federated_variant() -> Result<()> {
        let config = AuthConfig::new("http://localhost:3000".to_string());
        assert!(identity_provider(Variant::Session, &config, Some(credentials(None)))?.is_none());
        assert!(identity_provider(Variant::Hashing, &config, Some(credentials(None)))?.is_none());
        assert!(identity_provider(Variant::Federated, &config, None)?.is_none());

        let provider = identity_provider(Variant::Federated, &config, Some(credentials(None)))?;
        assert_eq!(provider.map(|p| p.name()), Some("google"));
        Ok(())
    }

    #[test]
    fn default_callback_follows_base_url() -> Result<()> {
        let config = AuthConfig::new("https://confide.dev".to_string());
        let provider = identity_provider(Variant::Federated, &config, Some(credentials(None)))?
            .context("provider should be configured")?;
        let request = provider.authorize();
        let url = Url::parse(&request.url)?;
        let redirect = url
            .query_pairs()
            .find(|(key, _)| key == "redirect_uri")
            .map(|(_, value)| value.into_owned());
        assert_eq!(
            redirect.as_deref(),
            Some("https://confide.dev/auth/google/secrets")
        );
        Ok(())
    }

    #[test]
    fn invalid_callback_url_fails_startup() {
        let config = AuthConfig::new("http://localhost:3000".to_string());
        let result = identity_provider(
            Variant::Federated,
            &config,
            Some(credentials(Some("not a url"))),
        );
        assert!(result.is_err());
    }
}
