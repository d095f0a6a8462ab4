use crate::confide::{
    handlers::{google, health, home, login, logout, register, secrets, submit},
    state::AuthState,
    store::Store,
};
use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::get,
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;

pub mod account;
pub mod handlers;
pub mod oauth;
pub mod pages;
pub mod password;
pub mod session;
pub mod state;
pub mod store;
pub mod variant;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        home::home,
        register::register_page,
        register::register,
        login::login_page,
        login::login,
        logout::logout,
        secrets::secrets,
        submit::submit_page,
        submit::submit,
        google::auth_google,
        google::google_callback,
    ),
    components(schemas(health::Health, register::Credentials, submit::SecretForm)),
    tags(
        (name = "confide", description = "Register, log in and share secrets")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Build the router for the configured variant.
///
/// `/secrets` and `/submit` only exist for the variants that use them, and the
/// Google routes only when a provider is configured.
pub fn router(auth_state: Arc<AuthState>, store: Arc<dyn Store>) -> Router {
    let variant = auth_state.variant();

    let mut app = Router::new()
        .route("/", get(handlers::home))
        .route(
            "/register",
            get(handlers::register_page).post(handlers::register),
        )
        .route("/login", get(handlers::login_page).post(handlers::login))
        .route("/logout", get(handlers::logout))
        .route("/health", get(handlers::health).options(handlers::health));

    if variant.uses_sessions() {
        app = app.route("/secrets", get(handlers::secrets));
    }

    if variant.shares_secrets() {
        app = app.route("/submit", get(handlers::submit_page).post(handlers::submit));
    }

    if variant.federated_login() && auth_state.provider().is_some() {
        app = app
            .route("/auth/google", get(handlers::auth_google))
            .route("/auth/google/secrets", get(handlers::google_callback));
    }

    app.layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(Extension(auth_state))
            .layer(Extension(store)),
    )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, auth_state: Arc<AuthState>, store: Arc<dyn Store>) -> Result<()> {
    let variant = auth_state.variant();
    let base_url = auth_state.config().base_url().to_string();

    let app = router(auth_state, store);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!(
        "Listening on [::]:{}, variant: {}, public URL: {}",
        port, variant, base_url
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
