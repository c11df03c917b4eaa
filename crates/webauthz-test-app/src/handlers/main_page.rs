use axum::extract::{Extension, RawQuery};
use serde::Deserialize;

use crate::security::SessionHandle;
use crate::templates::{MainView, Page};
use crate::utils::{parse_query, AppError};

#[derive(Debug, Deserialize)]
pub struct MainPageQuery {
    pub url: Option<String>,
}

/// Landing page - GET /
pub async fn main_page(
    Extension(session): Extension<SessionHandle>,
    RawQuery(raw_query): RawQuery,
) -> Result<Page, AppError> {
    let query: MainPageQuery = parse_query(raw_query.as_deref())?;

    Ok(Page::Main(MainView {
        url: query.url,
        username: session.username(),
        ..MainView::default()
    }))
}
