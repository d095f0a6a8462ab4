//! HTML pages rendered with Tera.
//!
//! Templates are embedded at compile time; names end in `.html` so Tera
//! autoescapes every interpolated value, including user-submitted secrets.

use anyhow::{Context as _, Result};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tera::{Context, Tera};
use tracing::error;

use super::variant::Variant;

const TEMPLATES: [(&str, &str); 6] = [
    ("base.html", include_str!("../../templates/base.html")),
    ("home.html", include_str!("../../templates/home.html")),
    ("register.html", include_str!("../../templates/register.html")),
    ("login.html", include_str!("../../templates/login.html")),
    ("secrets.html", include_str!("../../templates/secrets.html")),
    ("submit.html", include_str!("../../templates/submit.html")),
];

pub struct Pages {
    tera: Tera,
    variant: Variant,
    google_login: bool,
}

impl Pages {
    /// Parse the embedded templates.
    ///
    /// # Errors
    /// Returns an error if a template does not parse.
    pub fn new(variant: Variant, google_login: bool) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.to_vec())
            .context("failed to parse page templates")?;
        Ok(Self {
            tera,
            variant,
            google_login,
        })
    }

    fn context(&self) -> Context {
        let mut context = Context::new();
        context.insert("sessions", &self.variant.uses_sessions());
        context.insert("shares_secrets", &self.variant.shares_secrets());
        context.insert("google_login", &self.google_login);
        context
    }

    fn render(&self, name: &str, context: &Context) -> Result<String> {
        self.tera
            .render(name, context)
            .with_context(|| format!("failed to render {name}"))
    }

    pub fn home(&self) -> Result<String> {
        self.render("home.html", &self.context())
    }

    pub fn register(&self) -> Result<String> {
        self.render("register.html", &self.context())
    }

    pub fn login(&self) -> Result<String> {
        self.render("login.html", &self.context())
    }

    pub fn submit(&self) -> Result<String> {
        self.render("submit.html", &self.context())
    }

    /// Protected page; `secrets` is only shown when the variant shares them.
    pub fn secrets(&self, secrets: &[String]) -> Result<String> {
        let mut context = self.context();
        context.insert("secrets", secrets);
        self.render("secrets.html", &context)
    }
}

/// Turn a rendered page into a response, logging render failures as 500s.
pub(crate) fn html(page: Result<String>) -> Response {
    match page {
        Ok(body) => Html(body).into_response(),
        Err(err) => {
            error!("Failed to render page: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
