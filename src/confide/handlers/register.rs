use super::{normalize_username, redirect, sign_in, valid_username};
use crate::confide::{
    account::CreateOutcome, pages::html, password::hash_password_blocking, state::AuthState,
    store::Store,
};
use axum::{
    extract::{Extension, Form},
    response::Response,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

/// Username/password form shared by `/register` and `/login`.
#[derive(ToSchema, Deserialize, Debug)]
pub struct Credentials {
    pub username: String,
    #[schema(value_type = String, format = Password)]
    pub password: SecretString,
}

#[utoipa::path(
    get,
    path= "/register",
    responses (
        (status = 200, description = "Registration form", content_type = "text/html"),
    ),
    tag= "register"
)]
pub async fn register_page(Extension(auth_state): Extension<Arc<AuthState>>) -> Response {
    html(auth_state.pages().register())
}

#[utoipa::path(
    post,
    path= "/register",
    request_body(content = Credentials, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 200, description = "Account created, secrets page rendered (hashing variant)", content_type = "text/html"),
        (status = 303, description = "Account created and session started (redirect to /secrets), or registration failed (redirect to /register)"),
    ),
    tag= "register"
)]
#[instrument(skip_all)]
pub async fn register(
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(store): Extension<Arc<dyn Store>>,
    payload: Option<Form<Credentials>>,
) -> Response {
    let Some(Form(credentials)) = payload else {
        error!("Missing or malformed registration form");
        return redirect("/register");
    };

    let username = normalize_username(&credentials.username);

    if !valid_username(&username) {
        error!("Invalid username");
        return redirect("/register");
    }

    if credentials.password.expose_secret().is_empty() {
        error!("Empty password");
        return redirect("/register");
    }

    let password_hash = match hash_password_blocking(credentials.password).await {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {:#}", err);
            return redirect("/register");
        }
    };

    match store.create_local_account(&username, &password_hash).await {
        Ok(CreateOutcome::Created(account)) => {
            debug!("Account created: {}", account.id);
            sign_in(&auth_state, store.as_ref(), account.id).await
        }
        Ok(CreateOutcome::Conflict) => {
            error!("Username already registered");
            redirect("/register")
        }
        Err(err) => {
            error!("Failed to create account: {:#}", err);
            redirect("/register")
        }
    }
}
