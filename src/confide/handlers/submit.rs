use super::{authenticated, redirect};
use crate::confide::{pages::html, state::AuthState, store::Store};
use axum::{
    extract::{Extension, Form},
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug)]
pub struct SecretForm {
    pub secret: String,
}

#[utoipa::path(
    get,
    path= "/submit",
    responses (
        (status = 200, description = "Secret submission form", content_type = "text/html"),
        (status = 303, description = "Not signed in, redirect to /login"),
    ),
    tag= "secrets"
)]
pub async fn submit_page(
    headers: HeaderMap,
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(store): Extension<Arc<dyn Store>>,
) -> Response {
    if authenticated(&headers, store.as_ref()).await.is_some() {
        html(auth_state.pages().submit())
    } else {
        redirect("/login")
    }
}

#[utoipa::path(
    post,
    path= "/submit",
    request_body(content = SecretForm, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 303, description = "Secret stored (redirect to /secrets), empty secret (redirect to /submit) or not signed in (redirect to /login)"),
    ),
    tag= "secrets"
)]
#[instrument(skip_all)]
pub async fn submit(
    headers: HeaderMap,
    Extension(store): Extension<Arc<dyn Store>>,
    payload: Option<Form<SecretForm>>,
) -> Response {
    let Some(account) = authenticated(&headers, store.as_ref()).await else {
        debug!("No session, redirecting to login");
        return redirect("/login");
    };

    let Some(Form(form)) = payload else {
        error!("Missing or malformed secret form");
        return redirect("/submit");
    };

    let secret = form.secret.trim();
    if secret.is_empty() {
        debug!("Empty secret ignored");
        return redirect("/submit");
    }

    match store.set_secret(account.id, secret).await {
        Ok(true) => {
            debug!("Secret stored for account {}", account.id);
            redirect("/secrets")
        }
        Ok(false) => {
            error!("Account {} vanished before its secret was stored", account.id);
            redirect("/login")
        }
        Err(err) => {
            error!("Failed to store secret: {:#}", err);
            redirect("/submit")
        }
    }
}
