use crate::confide::{pages::html, state::AuthState};
use axum::{extract::Extension, response::Response};
use std::sync::Arc;

#[utoipa::path(
    get,
    path= "/",
    responses (
        (status = 200, description = "Landing page", content_type = "text/html"),
    ),
    tag= "pages"
)]
pub async fn home(Extension(auth_state): Extension<Arc<AuthState>>) -> Response {
    html(auth_state.pages().home())
}
