use axum::extract::{Extension, RawQuery, State};
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::security::SessionHandle;
use crate::services::resource_service::{format_body, status_line};
use crate::services::FetchOutcome;
use crate::state::AppState;
use crate::templates::{MainView, Page};
use crate::utils::{parse_query, AppError};

#[derive(Debug, Deserialize)]
pub struct ResourceQuery {
    pub url: Option<String>,
}

/// Protected resource proxy - GET /resource?url=
pub async fn resource_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    RawQuery(raw_query): RawQuery,
) -> Result<Page, AppError> {
    let username = session
        .authenticated_user(Utc::now())
        .ok_or_else(|| AppError::Unauthorized("login to access resources".to_string()))?;
    let query: ResourceQuery = parse_query(raw_query.as_deref())?;

    let Some(resource_url) = query.url.filter(|url| !url.is_empty()) else {
        debug!("Resource requested without url");
        return Ok(Page::Fault("resource url is required".to_string()));
    };

    info!("Resource request by {}: {}", username, resource_url);

    // token from an earlier grant, if any
    let access_token = match state.webauthz.get_access_token(&resource_url, &username).await {
        Ok(token) => token,
        Err(e) => {
            warn!("Access token lookup failed for {}: {}", resource_url, e);
            None
        }
    };

    let page = |error: String, webauthz: Option<String>| {
        Page::Main(MainView {
            url: Some(resource_url.clone()),
            username: Some(username.clone()),
            error: Some(error),
            webauthz,
            ..MainView::default()
        })
    };

    let outcome = match state
        .resources
        .fetch(&resource_url, access_token.as_deref())
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Unexpected error while accessing resource {}: {}", resource_url, e);
            return Ok(page("request failed".to_string(), None));
        }
    };

    match outcome {
        FetchOutcome::Success(body) => match format_body(&body) {
            Some(content) => Ok(Page::Main(MainView {
                url: Some(resource_url.clone()),
                username: Some(username.clone()),
                content: Some(content),
                ..MainView::default()
            })),
            None => Ok(page("request failed".to_string(), None)),
        },
        FetchOutcome::Failed { status, headers } => {
            let status_text = status_line(status);

            let challenge = state
                .webauthz
                .check_response_for_webauthz(&username, &resource_url, status, &headers)
                .await;

            let access_request = match challenge {
                Ok(Some(info)) => match state.webauthz.create_access_request(&info, "GET").await {
                    Ok(created) => Some(created.access_request_uri),
                    Err(e) => {
                        error!("Webauthz access request failed for {}: {}", resource_url, e);
                        None
                    }
                },
                Ok(None) => None,
                Err(e) => {
                    error!("Webauthz check failed for {}: {}", resource_url, e);
                    None
                }
            };

            if access_request.is_some() {
                info!("Webauthz challenge from {} ({})", resource_url, status_text);
            }

            Ok(page(status_text, access_request))
        }
    }
}
