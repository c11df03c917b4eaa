//! Webauthz client: the trait applications depend on and its HTTP implementation

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::challenge::find_challenge;
use crate::database::WebauthzDatabase;
use crate::error::{Result, WebauthzError};
use crate::types::*;

/// Operations an application needs to access Webauthz-protected resources.
#[async_trait]
pub trait WebauthzClient: Send + Sync {
    /// Access token previously granted for this resource and user, if still valid.
    async fn get_access_token(&self, resource_uri: &str, user_id: &str) -> Result<Option<String>>;

    /// Inspect a failed resource response for a Webauthz challenge.
    async fn check_response_for_webauthz(
        &self,
        user_id: &str,
        resource_uri: &str,
        status: StatusCode,
        headers: &HeaderMap,
    ) -> Result<Option<WebauthzInfo>>;

    async fn create_access_request(&self, info: &WebauthzInfo, method: &str) -> Result<CreatedAccessRequest>;

    /// Pending access request, only if it belongs to `user_id`.
    async fn get_access_request(&self, client_state: &str, user_id: &str) -> Result<AccessRequest>;

    /// Exchange a grant token for an access token.
    async fn exchange(&self, request: ExchangeRequest) -> Result<ExchangeOutcome>;
}

#[derive(Debug, Clone)]
pub struct WebauthzConfig {
    pub client_name: String,
    pub grant_redirect_uri: String,
}

pub struct Webauthz {
    http: Client,
    config: WebauthzConfig,
    database: Arc<dyn WebauthzDatabase>,
}

impl Webauthz {
    pub fn new(config: WebauthzConfig, database: Arc<dyn WebauthzDatabase>) -> Result<Self> {
        let http = Client::builder().build()?;
        Ok(Self::with_http_client(http, config, database))
    }

    pub fn with_http_client(http: Client, config: WebauthzConfig, database: Arc<dyn WebauthzDatabase>) -> Self {
        info!(
            "Webauthz client '{}' using grant redirect {}",
            config.client_name, config.grant_redirect_uri
        );
        Self { http, config, database }
    }

    async fn discover(&self, discovery_uri: &str) -> Result<WebauthzDiscovery> {
        debug!("Fetching Webauthz discovery document {}", discovery_uri);
        let response = self
            .http
            .get(discovery_uri)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        read_json(discovery_uri, response).await
    }

    /// Cached registration for this authorization server, registering on first use.
    async fn registration(&self, discovery: &WebauthzDiscovery) -> Result<ClientRegistration> {
        let register_uri = &discovery.webauthz_register_uri;
        if let Some(existing) = self.database.get_client_registration(register_uri).await? {
            return Ok(existing);
        }

        info!("Registering client with {}", register_uri);
        let body = RegisterRequestBody {
            client_name: &self.config.client_name,
            grant_redirect_uri: &self.config.grant_redirect_uri,
        };
        let registration: ClientRegistration = self.post_json(register_uri, None, &body).await?;
        self.database
            .put_client_registration(register_uri, registration.clone())
            .await?;
        Ok(registration)
    }

    async fn post_json<B, T>(&self, uri: &str, bearer: Option<&str>, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self.send_post(uri, bearer, body).await?;
        read_json(uri, response).await
    }

    async fn send_post<B>(&self, uri: &str, bearer: Option<&str>, body: &B) -> Result<Response>
    where
        B: Serialize + Sync,
    {
        let mut request = self
            .http
            .post(uri)
            .header(ACCEPT, "application/json")
            .json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        Ok(request.send().await?)
    }
}

#[async_trait]
impl WebauthzClient for Webauthz {
    async fn get_access_token(&self, resource_uri: &str, user_id: &str) -> Result<Option<String>> {
        let Some(stored) = self.database.get_access_token(resource_uri, user_id).await? else {
            return Ok(None);
        };
        if stored.is_expired(Utc::now()) {
            debug!("Access token for {} ({}) has expired", resource_uri, user_id);
            return Ok(None);
        }
        Ok(Some(stored.token))
    }

    async fn check_response_for_webauthz(
        &self,
        user_id: &str,
        resource_uri: &str,
        status: StatusCode,
        headers: &HeaderMap,
    ) -> Result<Option<WebauthzInfo>> {
        if status != StatusCode::UNAUTHORIZED && status != StatusCode::FORBIDDEN {
            return Ok(None);
        }
        let Some(challenge) = find_challenge(headers) else {
            debug!("No Webauthz challenge in {} response from {}", status, resource_uri);
            return Ok(None);
        };

        // discovery URI may be relative to the resource
        let discovery_uri = Url::parse(resource_uri)
            .and_then(|base| base.join(&challenge.discovery_uri))
            .map_err(|e| WebauthzError::InvalidUri(format!("{}: {}", challenge.discovery_uri, e)))?;

        let discovery = self.discover(discovery_uri.as_str()).await?;
        let registration = self.registration(&discovery).await?;

        Ok(Some(WebauthzInfo {
            user_id: user_id.to_string(),
            resource_uri: resource_uri.to_string(),
            realm: challenge.realm,
            scope: challenge.scope,
            discovery,
            registration,
        }))
    }

    async fn create_access_request(&self, info: &WebauthzInfo, method: &str) -> Result<CreatedAccessRequest> {
        let client_state = hex::encode(rand::random::<[u8; 16]>());

        let body = AccessRequestBody {
            realm: info.realm.as_deref(),
            scope: info.scope.as_deref(),
            client_state: &client_state,
        };
        let response: AccessRequestResponse = self
            .post_json(
                &info.discovery.webauthz_request_uri,
                Some(&info.registration.client_token),
                &body,
            )
            .await?;
        let access_request_uri = checked_redirect(response.redirect)?;

        self.database
            .put_access_request(AccessRequest {
                client_state: client_state.clone(),
                user_id: info.user_id.clone(),
                resource_uri: info.resource_uri.clone(),
                realm: info.realm.clone(),
                scope: info.scope.clone(),
                method: method.to_string(),
                exchange_uri: info.discovery.webauthz_exchange_uri.clone(),
                registration: info.registration.clone(),
                created_at: Utc::now(),
            })
            .await?;

        info!(
            "Created access request {} for {} ({})",
            client_state, info.resource_uri, info.user_id
        );

        Ok(CreatedAccessRequest {
            client_state,
            access_request_uri,
        })
    }

    async fn get_access_request(&self, client_state: &str, user_id: &str) -> Result<AccessRequest> {
        let request = self
            .database
            .get_access_request(client_state)
            .await?
            .ok_or_else(|| WebauthzError::AccessRequestNotFound(client_state.to_string()))?;

        if request.user_id != user_id {
            warn!(
                "Access request {} requested by {} but belongs to another user",
                client_state, user_id
            );
            return Err(WebauthzError::AccessRequestUserMismatch {
                client_state: client_state.to_string(),
                user_id: user_id.to_string(),
            });
        }

        Ok(request)
    }

    async fn exchange(&self, request: ExchangeRequest) -> Result<ExchangeOutcome> {
        let access_request = self
            .get_access_request(&request.client_state, &request.user_id)
            .await?;

        if access_request.registration.client_id != request.client_id {
            return Err(WebauthzError::ClientMismatch(request.client_state));
        }

        let grant_token = request
            .grant_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or(WebauthzError::MissingGrantToken)?;

        let response = self
            .send_post(
                &access_request.exchange_uri,
                Some(&access_request.registration.client_token),
                &ExchangeRequestBody { grant_token },
            )
            .await?;

        if response.status() == StatusCode::FORBIDDEN {
            info!("Grant token exchange denied for {}", request.client_state);
            return Ok(ExchangeOutcome {
                status: ExchangeStatus::Denied,
            });
        }

        let exchanged: ExchangeResponse = read_json(&access_request.exchange_uri, response).await?;
        // lifetimes beyond what a timestamp can hold are stored without expiry
        let not_after = exchanged
            .access_token_max_seconds
            .and_then(Duration::try_seconds)
            .and_then(|max_age| Utc::now().checked_add_signed(max_age));

        self.database
            .put_access_token(
                &access_request.resource_uri,
                &access_request.user_id,
                StoredAccessToken {
                    token: exchanged.access_token,
                    not_after,
                },
            )
            .await?;
        self.database
            .delete_access_request(&access_request.client_state)
            .await?;

        info!(
            "Access granted to {} for {}",
            access_request.user_id, access_request.resource_uri
        );

        Ok(ExchangeOutcome {
            status: ExchangeStatus::Granted,
        })
    }
}

/// The access request URI is shown to the user as a link, so only web URLs pass.
fn checked_redirect(redirect: String) -> Result<String> {
    let url = Url::parse(&redirect).map_err(|e| WebauthzError::InvalidUri(format!("{}: {}", redirect, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(redirect),
        scheme => Err(WebauthzError::InvalidUri(format!(
            "access request uri with scheme {}",
            scheme
        ))),
    }
}

async fn read_json<T: DeserializeOwned>(uri: &str, response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(WebauthzError::UnexpectedStatus {
            uri: uri.to_string(),
            status,
        });
    }
    Ok(response.json::<T>().await?)
}
