use super::{redirect, sign_in};
use crate::confide::{state::AuthState, store::Store};
use axum::{
    extract::{Extension, Query},
    response::Response,
};
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, instrument};
use utoipa::IntoParams;

/// Query string Google appends to the callback URL.
#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[utoipa::path(
    get,
    path= "/auth/google",
    responses (
        (status = 303, description = "Redirect to the Google consent screen"),
    ),
    tag= "google"
)]
#[instrument(skip_all)]
pub async fn auth_google(
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(store): Extension<Arc<dyn Store>>,
) -> Response {
    let Some(provider) = auth_state.provider() else {
        error!("Federated login is not configured");
        return redirect("/login");
    };

    let request = provider.authorize();
    let ttl = Duration::from_secs(auth_state.config().oauth_state_ttl_seconds());

    if let Err(err) = store
        .insert_oauth_state(&request.state, &request.pkce_verifier, ttl)
        .await
    {
        error!("Failed to store OAuth state: {:#}", err);
        return redirect("/login");
    }

    debug!("Redirecting to {} for authorization", provider.name());

    redirect(&request.url)
}

#[utoipa::path(
    get,
    path= "/auth/google/secrets",
    params(CallbackQuery),
    responses (
        (status = 303, description = "Signed in (redirect to /secrets) or login failed (redirect to /login)"),
    ),
    tag= "google"
)]
#[instrument(skip_all)]
pub async fn google_callback(
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(store): Extension<Arc<dyn Store>>,
    query: Option<Query<CallbackQuery>>,
) -> Response {
    let Some(provider) = auth_state.provider() else {
        error!("Federated login is not configured");
        return redirect("/login");
    };

    let Some(Query(query)) = query else {
        error!("Malformed OAuth callback query");
        return redirect("/login");
    };

    let Some(state) = query.state else {
        error!("OAuth callback without state");
        return redirect("/login");
    };

    // consume the state first so it cannot be replayed, even on failure
    let pkce_verifier = match store.take_oauth_state(&state).await {
        Ok(Some(verifier)) => verifier,
        Ok(None) => {
            error!("Unknown, expired or already used OAuth state");
            return redirect("/login");
        }
        Err(err) => {
            error!("Failed to load OAuth state: {:#}", err);
            return redirect("/login");
        }
    };

    if let Some(error) = query.error {
        debug!("{} denied authorization: {}", provider.name(), error);
        return redirect("/login");
    }

    let Some(code) = query.code else {
        error!("OAuth callback without code");
        return redirect("/login");
    };

    let profile = match provider.exchange(&code, &pkce_verifier).await {
        Ok(profile) => profile,
        Err(err) => {
            error!("Failed to exchange authorization code: {:#}", err);
            return redirect("/login");
        }
    };

    let account = match store
        .find_or_create_federated(
            provider.name(),
            &profile.subject,
            profile.display_name.as_deref(),
        )
        .await
    {
        Ok(account) => account,
        Err(err) => {
            error!("Failed to find or create federated account: {:#}", err);
            return redirect("/login");
        }
    };

    debug!("Federated login for account {}", account.id);

    sign_in(&auth_state, store.as_ref(), account.id).await
}
