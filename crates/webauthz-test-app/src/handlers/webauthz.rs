use axum::{
    extract::{Extension, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use webauthz_client::{ExchangeRequest, ExchangeStatus, WebauthzClient};

use crate::security::SessionHandle;
use crate::templates::{MainView, Page};
use crate::utils::{parse_query, AppError};

#[derive(Debug, Deserialize)]
pub struct GrantQuery {
    pub client_id: Option<String>,
    pub client_state: Option<String>,
    pub grant_token: Option<String>,
    pub status: Option<String>,
}

fn required(value: Option<String>, name: &str) -> Result<String, AppError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{} required", name)))
}

/// Grant callback - GET /webauthz/grant
///
/// Only authenticated users: the access request must belong to the same
/// user that created it.
pub async fn grant_handler(
    State(webauthz): State<Arc<dyn WebauthzClient>>,
    Extension(session): Extension<SessionHandle>,
    RawQuery(raw_query): RawQuery,
) -> Result<Response, AppError> {
    let username = session
        .authenticated_user(Utc::now())
        .ok_or_else(|| AppError::Unauthorized("login to manage webauthz requests".to_string()))?;
    let query: GrantQuery = parse_query(raw_query.as_deref())?;

    let client_id = required(query.client_id, "client_id")?;
    let client_state = required(query.client_state, "client_state")?;

    let access_request = webauthz
        .get_access_request(&client_state, &username)
        .await
        .map_err(|e| {
            error!("Failed to retrieve access request {}: {}", client_state, e);
            AppError::BadRequest("invalid request".to_string())
        })?;

    let denied = || {
        (
            StatusCode::FORBIDDEN,
            Page::Main(MainView {
                url: Some(access_request.resource_uri.clone()),
                username: Some(username.clone()),
                error: Some("access denied".to_string()),
                ..MainView::default()
            }),
        )
            .into_response()
    };

    if query.status.as_deref() == Some("denied") {
        info!("Access request {} denied by user {}", client_state, username);
        return Ok(denied());
    }

    let outcome = webauthz
        .exchange(ExchangeRequest {
            client_id,
            client_state: client_state.clone(),
            grant_token: query.grant_token,
            user_id: username.clone(),
        })
        .await;

    match outcome {
        Ok(outcome) if outcome.status == ExchangeStatus::Granted => {
            let location = format!(
                "/resource?{}",
                serde_urlencoded::to_string([("url", access_request.resource_uri.as_str())])
                    .map_err(|e| AppError::InternalError(e.to_string()))?
            );
            Ok(Redirect::to(&location).into_response())
        }
        Ok(outcome) => {
            info!("Grant exchange for {} ended with {:?}", client_state, outcome.status);
            Ok(denied())
        }
        Err(e) => {
            error!("Grant exchange for {} failed: {}", client_state, e);
            Ok(denied())
        }
    }
}
