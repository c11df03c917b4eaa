use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::handlers;
use crate::security::{headers::response_headers_middleware, middleware::session_middleware};
use crate::state::AppState;
use crate::utils::error::{handle_panic, server_error_middleware};

pub fn build_router(state: AppState) -> Router {
    // Main user interface routes
    let ui_routes = Router::new()
        .route("/", get(handlers::main_page::main_page))
        .route("/resource", get(handlers::resource::resource_handler))
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout));

    // Webauthz user interface routes
    let webauthz_routes =
        Router::new().route("/webauthz/grant", get(handlers::webauthz::grant_handler));

    Router::new()
        .merge(ui_routes)
        .merge(webauthz_routes)
        // Session (runs before every handler)
        .layer(middleware::from_fn_with_state(state.clone(), session_middleware))
        // Error handling
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(server_error_middleware))
        .layer(middleware::from_fn(response_headers_middleware))
        // Tracing
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(state)
}
