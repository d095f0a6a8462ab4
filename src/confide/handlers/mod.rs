pub mod health;
pub use self::health::health;

pub mod home;
pub use self::home::home;

pub mod register;
pub use self::register::{register, register_page};

pub mod login;
pub use self::login::{login, login_page};

pub mod logout;
pub use self::logout::logout;

pub mod secrets;
pub use self::secrets::secrets;

pub mod submit;
pub use self::submit::{submit, submit_page};

pub mod google;
pub use self::google::{auth_google, google_callback};

// common functions for the handlers
use crate::confide::{
    account::Account,
    session::{current_account, start_session},
    state::AuthState,
    store::Store,
};
use axum::{
    http::{header::SET_COOKIE, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use regex::Regex;
use tracing::{debug, error};
use uuid::Uuid;

/// Normalize a username for lookup/uniqueness checks.
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// 1..=254 characters, no whitespace. Usernames are usually emails.
pub fn valid_username(username_normalized: &str) -> bool {
    Regex::new(r"^\S{1,254}$").is_ok_and(|re| re.is_match(username_normalized))
}

pub(crate) fn redirect(to: &str) -> Response {
    Redirect::to(to).into_response()
}

/// Resolve the current session to an account; store failures count as anonymous.
pub(crate) async fn authenticated(headers: &HeaderMap, store: &dyn Store) -> Option<Account> {
    match current_account(headers, store).await {
        Ok(account) => account,
        Err(err) => {
            error!("Failed to resolve session: {err:#}");
            None
        }
    }
}

/// Finish a successful login or registration.
///
/// Sessionless variants render the protected page right away; session variants
/// store the account id in a new session and redirect to `/secrets`.
pub(crate) async fn sign_in(auth_state: &AuthState, store: &dyn Store, account_id: Uuid) -> Response {
    if !auth_state.variant().uses_sessions() {
        return crate::confide::pages::html(auth_state.pages().secrets(&[]));
    }

    match start_session(store, auth_state.config(), account_id).await {
        Ok(cookie) => {
            debug!("Session started");
            let mut headers = HeaderMap::new();
            headers.insert(SET_COOKIE, cookie);
            (headers, Redirect::to("/secrets")).into_response()
        }
        Err(err) => {
            error!("Failed to start session: {err:#}");
            redirect("/login")
        }
    }
}
