#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response},
    Router,
};
use mockall::mock;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::sync::Arc;
use tower::ServiceExt;
use webauthz_client::{
    AccessRequest, CreatedAccessRequest, ExchangeOutcome, ExchangeRequest, WebauthzClient,
    WebauthzInfo,
};
use webauthz_test_app::build_router;
use webauthz_test_app::config::Settings;
use webauthz_test_app::state::AppState;

mock! {
    pub Webauthz {}

    #[async_trait]
    impl WebauthzClient for Webauthz {
        async fn get_access_token(&self, resource_uri: &str, user_id: &str) -> webauthz_client::Result<Option<String>>;
        async fn check_response_for_webauthz(
            &self,
            user_id: &str,
            resource_uri: &str,
            status: StatusCode,
            headers: &HeaderMap,
        ) -> webauthz_client::Result<Option<WebauthzInfo>>;
        async fn create_access_request(&self, info: &WebauthzInfo, method: &str) -> webauthz_client::Result<CreatedAccessRequest>;
        async fn get_access_request(&self, client_state: &str, user_id: &str) -> webauthz_client::Result<AccessRequest>;
        async fn exchange(&self, request: ExchangeRequest) -> webauthz_client::Result<ExchangeOutcome>;
    }
}

pub fn app_with(settings: Settings, webauthz: Arc<dyn WebauthzClient>) -> Router {
    build_router(AppState::new(settings, webauthz).expect("state should build"))
}

pub fn app(webauthz: MockWebauthz) -> Router {
    app_with(Settings::default(), Arc::new(webauthz))
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("router is infallible")
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// `name=value` part of the session Set-Cookie header.
pub fn session_cookie(response: &Response<Body>) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie should be set")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().trim().to_string()
}

pub fn set_cookie_header(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie should be set")
        .to_str()
        .unwrap()
        .to_string()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Log in as `username` and return the session cookie.
pub async fn login(app: &Router, username: &str) -> String {
    let first = send(app, get("/", None)).await;
    let cookie = session_cookie(&first);

    let response = send(app, post_form("/login", &format!("username={}", username), Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    cookie
}
