//! Protocol and storage types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Endpoints advertised by an authorization server's discovery document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebauthzDiscovery {
    pub webauthz_register_uri: String,
    pub webauthz_request_uri: String,
    pub webauthz_exchange_uri: String,
}

/// Credentials issued to this application by an authorization server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRegistration {
    pub client_id: String,
    pub client_token: String,
}

/// A recognized Webauthz challenge, ready to become an access request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebauthzInfo {
    pub user_id: String,
    pub resource_uri: String,
    pub realm: Option<String>,
    pub scope: Option<String>,
    pub discovery: WebauthzDiscovery,
    pub registration: ClientRegistration,
}

/// Pending access request, keyed by `client_state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    pub client_state: String,
    pub user_id: String,
    pub resource_uri: String,
    pub realm: Option<String>,
    pub scope: Option<String>,
    pub method: String,
    pub exchange_uri: String,
    pub registration: ClientRegistration,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedAccessRequest {
    pub client_state: String,
    /// Where the user must go to approve or deny the request.
    pub access_request_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAccessToken {
    pub token: String,
    pub not_after: Option<DateTime<Utc>>,
}

impl StoredAccessToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.not_after.is_some_and(|not_after| now > not_after)
    }
}

/// Parameters of the grant callback, passed through to the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRequest {
    pub client_id: String,
    pub client_state: String,
    pub grant_token: Option<String>,
    pub user_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeStatus {
    Granted,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeOutcome {
    pub status: ExchangeStatus,
}

// Wire payloads

#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequestBody<'a> {
    pub client_name: &'a str,
    pub grant_redirect_uri: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct AccessRequestBody<'a> {
    pub realm: Option<&'a str>,
    pub scope: Option<&'a str>,
    pub client_state: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccessRequestResponse {
    #[serde(alias = "access_request_uri")]
    pub redirect: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExchangeRequestBody<'a> {
    pub grant_token: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExchangeResponse {
    pub access_token: String,
    #[serde(default)]
    pub access_token_max_seconds: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_token_without_expiry_never_expires() {
        let token = StoredAccessToken {
            token: "abc".to_string(),
            not_after: None,
        };
        assert!(!token.is_expired(Utc::now() + Duration::days(3650)));
    }

    #[test]
    fn test_token_expiry() {
        let now = Utc::now();
        let token = StoredAccessToken {
            token: "abc".to_string(),
            not_after: Some(now),
        };
        assert!(!token.is_expired(now));
        assert!(token.is_expired(now + Duration::seconds(1)));
    }

    #[test]
    fn test_access_request_response_accepts_both_field_names() {
        let a: AccessRequestResponse =
            serde_json::from_str(r#"{"redirect":"https://as.test/prompt"}"#).unwrap();
        let b: AccessRequestResponse =
            serde_json::from_str(r#"{"access_request_uri":"https://as.test/prompt"}"#).unwrap();
        assert_eq!(a.redirect, b.redirect);
    }
}
