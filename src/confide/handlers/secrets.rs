use super::{authenticated, redirect};
use crate::confide::{pages::html, state::AuthState, store::Store};
use axum::{extract::Extension, http::HeaderMap, response::Response};
use std::sync::Arc;
use tracing::{debug, error, instrument};

#[utoipa::path(
    get,
    path= "/secrets",
    responses (
        (status = 200, description = "Secrets page: every shared secret (federated) or a static page for the signed-in user (session)", content_type = "text/html"),
        (status = 303, description = "Not signed in, redirect to /login"),
    ),
    tag= "secrets"
)]
#[instrument(skip_all)]
pub async fn secrets(
    headers: HeaderMap,
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(store): Extension<Arc<dyn Store>>,
) -> Response {
    // shared secrets are public, anonymous readers included
    if auth_state.variant().shares_secrets() {
        return match store.list_secrets().await {
            Ok(secrets) => {
                debug!("Listing {} secrets", secrets.len());
                html(auth_state.pages().secrets(&secrets))
            }
            Err(err) => {
                error!("Failed to list secrets: {:#}", err);
                redirect("/")
            }
        };
    }

    if authenticated(&headers, store.as_ref()).await.is_some() {
        html(auth_state.pages().secrets(&[]))
    } else {
        debug!("No session, redirecting to login");
        redirect("/login")
    }
}
