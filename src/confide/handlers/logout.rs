use crate::confide::{session::end_session, state::AuthState, store::Store};
use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{debug, error, instrument};

#[utoipa::path(
    get,
    path= "/logout",
    responses (
        (status = 303, description = "Session ended, redirect to /"),
    ),
    tag= "login"
)]
#[instrument(skip_all)]
pub async fn logout(
    headers: HeaderMap,
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(store): Extension<Arc<dyn Store>>,
) -> Response {
    if !auth_state.variant().uses_sessions() {
        return Redirect::to("/").into_response();
    }

    let (cookie, result) = end_session(&headers, store.as_ref(), auth_state.config()).await;

    match result {
        Ok(()) => debug!("Session ended"),
        Err(err) => error!("Failed to delete session: {:#}", err),
    }

    let mut response_headers = HeaderMap::new();
    if let Some(cookie) = cookie {
        response_headers.insert(SET_COOKIE, cookie);
    }

    (response_headers, Redirect::to("/")).into_response()
}
