use crate::confide::state::MAX_TTL_SECONDS;
use clap::{Arg, ArgMatches, Command};

pub const ARG_BASE_URL: &str = "base-url";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_OAUTH_STATE_TTL_SECONDS: &str = "oauth-state-ttl-seconds";

#[derive(Debug)]
pub struct Options {
    pub base_url: String,
    pub session_ttl_seconds: u64,
    pub oauth_state_ttl_seconds: u64,
}

impl Options {
    /// Parse session arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the base URL is not an http(s) URL or a TTL is out of range.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let base_url = matches
            .get_one::<String>(ARG_BASE_URL)
            .cloned()
            .unwrap_or_else(|| "http://localhost:3000".to_string());

        let parsed = url::Url::parse(&base_url)
            .map_err(|e| anyhow::anyhow!("invalid --{ARG_BASE_URL} '{base_url}': {e}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("--{ARG_BASE_URL} must be an http or https URL");
        }

        let session_ttl_seconds = matches
            .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
            .copied()
            .unwrap_or(86_400);
        let oauth_state_ttl_seconds = matches
            .get_one::<u64>(ARG_OAUTH_STATE_TTL_SECONDS)
            .copied()
            .unwrap_or(600);

        for ttl in [session_ttl_seconds, oauth_state_ttl_seconds] {
            if !(1..=MAX_TTL_SECONDS).contains(&ttl) {
                anyhow::bail!("TTL values must be between 1 and {MAX_TTL_SECONDS} seconds");
            }
        }

        Ok(Self {
            base_url,
            session_ttl_seconds,
            oauth_state_ttl_seconds,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BASE_URL)
                .long(ARG_BASE_URL)
                .help("Public base URL, decides the cookie Secure flag and the default Google callback")
                .env("CONFIDE_BASE_URL")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session cookie TTL in seconds")
                .env("CONFIDE_SESSION_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(u64).range(1..=MAX_TTL_SECONDS)),
        )
        .arg(
            Arg::new(ARG_OAUTH_STATE_TTL_SECONDS)
                .long(ARG_OAUTH_STATE_TTL_SECONDS)
                .help("How long a pending OAuth state stays valid, in seconds")
                .env("CONFIDE_OAUTH_STATE_TTL_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(u64).range(1..=MAX_TTL_SECONDS)),
        )
}
