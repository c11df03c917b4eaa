//! Storage for registrations, access requests and access tokens

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::types::{AccessRequest, ClientRegistration, StoredAccessToken};

/// Storage seam used by [`crate::Webauthz`].
#[async_trait]
pub trait WebauthzDatabase: Send + Sync {
    async fn get_client_registration(&self, register_uri: &str) -> Result<Option<ClientRegistration>>;
    async fn put_client_registration(&self, register_uri: &str, registration: ClientRegistration) -> Result<()>;

    async fn put_access_request(&self, request: AccessRequest) -> Result<()>;
    async fn get_access_request(&self, client_state: &str) -> Result<Option<AccessRequest>>;
    async fn delete_access_request(&self, client_state: &str) -> Result<()>;

    async fn put_access_token(&self, resource_uri: &str, user_id: &str, token: StoredAccessToken) -> Result<()>;
    async fn get_access_token(&self, resource_uri: &str, user_id: &str) -> Result<Option<StoredAccessToken>>;
}

/// Process-local storage, lost on restart.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    registrations: Arc<DashMap<String, ClientRegistration>>,
    access_requests: Arc<DashMap<String, AccessRequest>>,
    /// (resource_uri, user_id) -> token
    access_tokens: Arc<DashMap<(String, String), StoredAccessToken>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WebauthzDatabase for MemoryDatabase {
    async fn get_client_registration(&self, register_uri: &str) -> Result<Option<ClientRegistration>> {
        Ok(self.registrations.get(register_uri).map(|entry| entry.value().clone()))
    }

    async fn put_client_registration(&self, register_uri: &str, registration: ClientRegistration) -> Result<()> {
        debug!("Storing client registration for {}", register_uri);
        self.registrations.insert(register_uri.to_string(), registration);
        Ok(())
    }

    async fn put_access_request(&self, request: AccessRequest) -> Result<()> {
        self.access_requests.insert(request.client_state.clone(), request);
        Ok(())
    }

    async fn get_access_request(&self, client_state: &str) -> Result<Option<AccessRequest>> {
        Ok(self.access_requests.get(client_state).map(|entry| entry.value().clone()))
    }

    async fn delete_access_request(&self, client_state: &str) -> Result<()> {
        self.access_requests.remove(client_state);
        Ok(())
    }

    async fn put_access_token(&self, resource_uri: &str, user_id: &str, token: StoredAccessToken) -> Result<()> {
        self.access_tokens
            .insert((resource_uri.to_string(), user_id.to_string()), token);
        Ok(())
    }

    async fn get_access_token(&self, resource_uri: &str, user_id: &str) -> Result<Option<StoredAccessToken>> {
        let key = (resource_uri.to_string(), user_id.to_string());
        Ok(self.access_tokens.get(&key).map(|entry| entry.value().clone()))
    }
}
