//! Login / logout handlers
//!
//! Anyone can log in with just a username. A real application would
//! authenticate the user here.

use axum::{
    extract::{rejection::FormRejection, Extension, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::security::{SessionHandle, SessionStore};
use crate::templates::{MainView, Page};

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
}

/// Login handler - POST /login
pub async fn login(
    State(sessions): State<SessionStore>,
    Extension(session): Extension<SessionHandle>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    // login always starts from an anonymous session
    session.update(|s| s.logout());

    // a body that is not a login form counts as a blank username
    let form = match form {
        Ok(Form(form)) => form,
        Err(e) => {
            debug!("Login form rejected: {}", e);
            LoginForm::default()
        }
    };

    let username = form.username.trim();
    if username.is_empty() {
        warn!("Login rejected: non-empty username is required");
        return (
            StatusCode::BAD_REQUEST,
            Page::Main(MainView::error("username required to login")),
        )
            .into_response();
    }

    session.update(|s| s.login(username, Utc::now(), sessions.ttl()));
    info!("Login: {}", username);

    Redirect::to("/").into_response()
}

/// Logout handler - POST /logout
pub async fn logout(Extension(session): Extension<SessionHandle>) -> Redirect {
    if let Some(username) = session.username() {
        info!("Logout: {}", username);
    }
    session.update(|s| s.logout());
    Redirect::to("/")
}
