use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use webauthz_client::WebauthzClient;

use crate::config::Settings;
use crate::security::SessionStore;
use crate::services::ResourceService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub sessions: SessionStore,
    pub webauthz: Arc<dyn WebauthzClient>,
    pub resources: ResourceService,
}

impl AppState {
    pub fn new(settings: Settings, webauthz: Arc<dyn WebauthzClient>) -> anyhow::Result<Self> {
        let sessions = SessionStore::new(chrono::Duration::seconds(settings.session.ttl_seconds));
        let resources = ResourceService::new(
            settings
                .server
                .upstream_timeout_seconds
                .map(Duration::from_secs),
        )?;

        Ok(Self {
            settings: Arc::new(settings),
            sessions,
            webauthz,
            resources,
        })
    }
}

impl FromRef<AppState> for SessionStore {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for Arc<dyn WebauthzClient> {
    fn from_ref(state: &AppState) -> Self {
        state.webauthz.clone()
    }
}
