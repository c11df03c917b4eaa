use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Result of a resource fetch that reached the upstream server.
#[derive(Debug)]
pub enum FetchOutcome {
    /// 2xx, body as text (may be empty)
    Success(String),
    /// Non-2xx, kept for challenge inspection
    Failed { status: StatusCode, headers: HeaderMap },
}

/// Outbound client for protected resources.
#[derive(Clone)]
pub struct ResourceService {
    client: Client,
}

impl ResourceService {
    pub fn new(timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// GET the resource as JSON, with the access token as bearer if known.
    /// Transport failures (DNS, connect, invalid URL) are returned as errors.
    pub async fn fetch(&self, url: &str, access_token: Option<&str>) -> Result<FetchOutcome, reqwest::Error> {
        let mut request = self.client.get(url).header(ACCEPT, "application/json");
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }

        debug!("GET {} (bearer: {})", url, access_token.is_some());
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            return Ok(FetchOutcome::Failed {
                status,
                headers: response.headers().clone(),
            });
        }

        Ok(FetchOutcome::Success(response.text().await?))
    }
}

/// Format a successful body for display: pretty JSON, or the raw text as a
/// JSON string when it is not JSON. `None` for an empty body.
pub fn format_body(body: &str) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    let value = serde_json::from_str::<serde_json::Value>(body)
        .unwrap_or_else(|_| serde_json::Value::String(body.to_string()));
    serde_json::to_string_pretty(&value).ok()
}

/// `401 Unauthorized` style status line.
pub fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}
