//! Page templates, compiled once into a process-wide registry.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use handlebars::Handlebars;
use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::error;

const TEMPLATES: [(&str, &str); 3] = [
    ("main", include_str!("../../templates/main.hbs")),
    ("fault", include_str!("../../templates/fault.hbs")),
    ("error", include_str!("../../templates/error.hbs")),
];

static REGISTRY: Lazy<Handlebars<'static>> = Lazy::new(|| {
    let mut registry = Handlebars::new();
    for (name, source) in TEMPLATES {
        registry
            .register_template_string(name, source)
            .expect("embedded templates should be valid");
    }
    registry
});

pub fn registry() -> &'static Handlebars<'static> {
    &REGISTRY
}

/// Context of the main page.
#[derive(Debug, Default, Clone, Serialize)]
pub struct MainView {
    pub url: Option<String>,
    pub username: Option<String>,
    pub error: Option<String>,
    /// Pretty-printed resource body
    pub content: Option<String>,
    /// Access request URI to continue the Webauthz grant
    pub webauthz: Option<String>,
}

impl MainView {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

#[derive(Serialize)]
struct FaultView<'a> {
    fault: &'a str,
}

#[derive(Serialize)]
struct ErrorView<'a> {
    error: &'a str,
}

pub enum Page {
    Main(MainView),
    Fault(String),
    Error(String),
}

impl Page {
    pub fn render(&self) -> Result<String, handlebars::RenderError> {
        match self {
            Page::Main(view) => registry().render("main", view),
            Page::Fault(fault) => registry().render("fault", &FaultView { fault }),
            Page::Error(message) => registry().render("error", &ErrorView { error: message }),
        }
    }
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        match self.render() {
            Ok(html) => Html(html).into_response(),
            Err(e) => {
                error!("Template rendering failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "server error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_templates_registered() {
        for (name, _) in TEMPLATES {
            assert!(registry().has_template(name), "missing template {}", name);
        }
    }

    #[test]
    fn test_main_page_for_anonymous_user_shows_login() {
        let html = Page::Main(MainView::default()).render().unwrap();
        assert!(html.contains(r#"action="/login""#));
        assert!(!html.contains(r#"action="/logout""#));
    }

    #[test]
    fn test_main_page_escapes_values() {
        let html = Page::Main(MainView {
            username: Some("<alice>".to_string()),
            error: Some("401 Unauthorized".to_string()),
            webauthz: Some("https://as.test/prompt?id=1".to_string()),
            ..MainView::default()
        })
        .render()
        .unwrap();

        assert!(html.contains("&lt;alice&gt;"));
        assert!(!html.contains("<alice>"));
        assert!(html.contains("401 Unauthorized"));
        assert!(html.contains(r#"action="/logout""#));
        assert!(html.contains("https://as.test/prompt?id"));
    }

    #[test]
    fn test_fault_page() {
        let html = Page::Fault("resource url is required".to_string()).render().unwrap();
        assert!(html.contains("resource url is required"));
    }
}
