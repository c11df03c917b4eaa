use crate::security::session::SessionHandle;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::Utc;
use time::OffsetDateTime;
use tracing::{debug, warn};

/// Session middleware - load or create the session, expose it to the
/// handler, persist handler changes and re-issue the sliding cookie.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie_name = &state.settings.session.cookie_name;

    // Unparseable cookies are skipped by the jar, which yields a fresh session
    let jar = CookieJar::from_headers(request.headers());
    let presented = jar.get(cookie_name).map(|cookie| cookie.value().to_string());

    let (session_id, session) = state
        .sessions
        .load_or_create(presented.as_deref(), Utc::now());
    let handle = SessionHandle::new(session);
    request.extensions_mut().insert(handle.clone());

    let mut response = next.run(request).await;

    let now = Utc::now();
    match handle.take_changes() {
        Some(changed) => {
            debug!("Persisting session {}", session_id);
            state.sessions.save(&session_id, changed, now);
        }
        None => state.sessions.touch(&session_id, now),
    }

    let ttl = time::Duration::seconds(state.sessions.ttl().num_seconds());
    let cookie = Cookie::build((cookie_name.clone(), session_id))
        .path("/")
        .http_only(true)
        .secure(state.settings.is_production())
        .max_age(ttl)
        .expires(OffsetDateTime::now_utc() + ttl)
        .build();

    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => warn!("Failed to encode session cookie: {}", e),
    }

    response
}
