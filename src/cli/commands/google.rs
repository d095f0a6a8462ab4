use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_GOOGLE_CLIENT_ID: &str = "google-client-id";
pub const ARG_GOOGLE_CLIENT_SECRET: &str = "google-client-secret";
pub const ARG_GOOGLE_CALLBACK_URL: &str = "google-callback-url";

#[derive(Debug)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: SecretString,
    pub callback_url: Option<String>,
}

pub struct Options {
    pub credentials: Option<Credentials>,
}

impl Options {
    /// Parse Google OAuth arguments from matches.
    ///
    /// Google login is optional: no client id means no federated routes.
    ///
    /// # Errors
    /// Returns an error if a client id is given without a secret.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        // Helper to filter empty strings which clap might pass through if env vars are set to ""
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let Some(client_id) = get_non_empty(ARG_GOOGLE_CLIENT_ID) else {
            return Ok(Self { credentials: None });
        };

        let client_secret = get_non_empty(ARG_GOOGLE_CLIENT_SECRET).ok_or_else(|| {
            anyhow::anyhow!("missing required argument: --{ARG_GOOGLE_CLIENT_SECRET}")
        })?;

        Ok(Self {
            credentials: Some(Credentials {
                client_id,
                client_secret: SecretString::from(client_secret),
                callback_url: get_non_empty(ARG_GOOGLE_CALLBACK_URL),
            }),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_ID)
                .long(ARG_GOOGLE_CLIENT_ID)
                .help("Google OAuth client id, enables \"Sign in with Google\"")
                .env("CONFIDE_GOOGLE_CLIENT_ID"),
        )
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_SECRET)
                .long(ARG_GOOGLE_CLIENT_SECRET)
                .help("Google OAuth client secret")
                .env("CONFIDE_GOOGLE_CLIENT_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_GOOGLE_CALLBACK_URL)
                .long(ARG_GOOGLE_CALLBACK_URL)
                .help("OAuth redirect URL (default: <base-url>/auth/google/secrets)")
                .env("CONFIDE_GOOGLE_CALLBACK_URL"),
        )
}
