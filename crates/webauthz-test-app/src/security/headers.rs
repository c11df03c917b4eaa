use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

const RESPONSE_HEADERS: [(HeaderName, &str); 6] = [
    // browsers must not cache pages that depend on the session
    (header::PRAGMA, "no-cache"),
    (header::CACHE_CONTROL, "no-cache, no-store"),
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "SAMEORIGIN"),
    (header::REFERRER_POLICY, "no-referrer"),
    (header::X_DNS_PREFETCH_CONTROL, "off"),
];

/// Add no-cache and baseline hardening headers to every response.
pub async fn response_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    for (name, value) in RESPONSE_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
    headers.remove("x-powered-by");

    response
}
