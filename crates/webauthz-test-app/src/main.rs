use anyhow::Result;
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use webauthz_client::{MemoryDatabase, Webauthz, WebauthzConfig};

use webauthz_test_app::build_router;
use webauthz_test_app::config::Settings;
use webauthz_test_app::security::SessionStore;
use webauthz_test_app::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,webauthz_test_app=debug,webauthz_client=debug")
            }),
        )
        .with_target(true)
        .json()
        .init();

    info!("Starting Webauthz test application...");

    let settings = Settings::load()?;
    info!("Configuration loaded");

    // Webauthz client with in-memory database
    let webauthz = Webauthz::new(
        WebauthzConfig {
            client_name: settings.webauthz.client_name.clone(),
            grant_redirect_uri: settings.grant_redirect_uri(),
        },
        Arc::new(MemoryDatabase::new()),
    )?;

    let endpoint_url = settings.endpoint_url();
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.server.listen_port));
    let cleanup_interval = Duration::from_secs(settings.session.cleanup_interval_seconds.max(1));

    let state = AppState::new(settings, Arc::new(webauthz))?;
    spawn_session_cleanup(state.sessions.clone(), cleanup_interval);

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Http service started on {}", addr);
    info!("{}", endpoint_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Http server closed.");
    Ok(())
}

/// Periodically drop sessions whose cookie has expired.
fn spawn_session_cleanup(sessions: SessionStore, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            sessions.cleanup_expired(Utc::now());
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for SIGINT")
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        let mut sigquit = signal(SignalKind::quit()).expect("failed to install SIGQUIT handler");
        tokio::select! {
            _ = sigterm.recv() => (),
            _ = sigquit.recv() => (),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => (),
        _ = terminate => (),
    }
    info!("Shutdown signal received, closing http server");
}
