//! Command-line argument dispatch.
//!
//! Parses validated CLI arguments and maps them to the server action with its
//! full configuration.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, google, ARG_DSN, ARG_PORT, ARG_VARIANT};
use crate::confide::variant::Variant;
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(3000);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;
    let variant = matches
        .get_one::<Variant>(ARG_VARIANT)
        .copied()
        .unwrap_or(Variant::Federated);

    let auth_opts = auth::Options::parse(matches)?;
    let google_opts = google::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        variant,
        base_url: auth_opts.base_url,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        oauth_state_ttl_seconds: auth_opts.oauth_state_ttl_seconds,
        google: google_opts.credentials,
    }))
}
