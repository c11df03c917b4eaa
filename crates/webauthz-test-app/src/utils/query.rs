use serde::de::DeserializeOwned;
use tracing::warn;

use super::error::AppError;

/// Deserialize the raw query string. Handlers call this once their own
/// checks have run, so a malformed query never preempts a login prompt.
pub fn parse_query<T: DeserializeOwned>(raw: Option<&str>) -> Result<T, AppError> {
    serde_urlencoded::from_str(raw.unwrap_or_default()).map_err(|e| {
        warn!("Rejected query string: {}", e);
        AppError::BadRequest("invalid query".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct UrlQuery {
        url: Option<String>,
    }

    #[test]
    fn test_missing_query_is_empty() {
        let query: UrlQuery = parse_query(None).unwrap();
        assert!(query.url.is_none());
    }

    #[test]
    fn test_decodes_values() {
        let query: UrlQuery = parse_query(Some("url=https%3A%2F%2Frs.test%2Fa%3Fb%3D1")).unwrap();
        assert_eq!(query.url.as_deref(), Some("https://rs.test/a?b=1"));
    }

    #[test]
    fn test_duplicate_field_is_bad_request() {
        let result = parse_query::<UrlQuery>(Some("url=a&url=b"));
        assert!(matches!(result, Err(AppError::BadRequest(msg)) if msg == "invalid query"));
    }
}
