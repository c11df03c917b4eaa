use crate::templates::{MainView, Page};
use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::any::Any;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Rendered as the main page so the user can log in
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rendered as a fault page
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

#[derive(Serialize)]
struct ServerErrorResponse {
    error: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Unauthorized(msg) => {
                tracing::warn!("Unauthorized: {}", msg);
                (StatusCode::UNAUTHORIZED, Page::Main(MainView::error(msg))).into_response()
            }
            AppError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, Page::Fault(msg)).into_response()
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, Page::Error(msg)).into_response()
            }
        }
    }
}

/// Answer server errors with JSON for clients that only accept JSON;
/// everyone else keeps the rendered error page.
pub async fn server_error_middleware(request: Request, next: Next) -> Response {
    let wants_json = request
        .headers()
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept == "application/json");

    let response = next.run(request).await;

    if wants_json && response.status() == StatusCode::INTERNAL_SERVER_ERROR {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ServerErrorResponse {
                error: "server-error",
            }),
        )
            .into_response();
    }

    response
}

/// Panic handler for `CatchPanicLayer`.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    AppError::InternalError(detail).into_response()
}
