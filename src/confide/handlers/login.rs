use super::{normalize_username, redirect, register::Credentials, sign_in};
use crate::confide::{
    pages::html, password::verify_password_blocking, state::AuthState, store::Store,
};
use axum::{
    extract::{Extension, Form},
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, error, instrument};

#[utoipa::path(
    get,
    path= "/login",
    responses (
        (status = 200, description = "Login form", content_type = "text/html"),
    ),
    tag= "login"
)]
pub async fn login_page(Extension(auth_state): Extension<Arc<AuthState>>) -> Response {
    html(auth_state.pages().login())
}

#[utoipa::path(
    post,
    path= "/login",
    request_body(content = Credentials, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 200, description = "Password matched, secrets page rendered (hashing variant)", content_type = "text/html"),
        (status = 303, description = "Session started (redirect to /secrets), or login failed (redirect to /login)"),
    ),
    tag= "login"
)]
#[instrument(skip_all)]
pub async fn login(
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(store): Extension<Arc<dyn Store>>,
    payload: Option<Form<Credentials>>,
) -> Response {
    let Some(Form(credentials)) = payload else {
        error!("Missing or malformed login form");
        return redirect("/login");
    };

    let username = normalize_username(&credentials.username);

    let account = match store.find_by_username(&username).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            debug!("Unknown username");
            return redirect("/login");
        }
        Err(err) => {
            error!("Failed to look up account: {:#}", err);
            return redirect("/login");
        }
    };

    // accounts created through federated login have no local password
    let Some(password_hash) = account.password_hash.clone() else {
        debug!("Account {} has no local password", account.id);
        return redirect("/login");
    };

    match verify_password_blocking(credentials.password, password_hash).await {
        Ok(true) => {
            debug!("Password verified for account {}", account.id);
            sign_in(&auth_state, store.as_ref(), account.id).await
        }
        Ok(false) => {
            debug!("Wrong password for account {}", account.id);
            redirect("/login")
        }
        Err(err) => {
            error!("Failed to verify password: {:#}", err);
            redirect("/login")
        }
    }
}
