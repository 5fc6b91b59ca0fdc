//! Footprint gateway.
//!
//! Serves the footprint client's views over HTTP and forwards calculations,
//! predictions and route lookups to the remote footprint service.
//!
//! # API Endpoints
//!
//! - `POST /login`, `POST /create-user`, `POST /logout` - Session
//! - `GET /dashboard`, `GET /trips`, `POST /trips` - Trip ledger
//! - `POST /calculate` - Standalone emissions calculators
//! - `GET /progress`, `POST /progress/goal` - Reduction goal
//! - `GET /prediction`, `GET /recommendations`, `POST /feedback`, `POST /chat`
//! - `GET /route-emissions`, `GET /eco-routes` - Routing
//! - `GET /health` - Health check
//!
//! See [`footprint::config`] for the environment variables.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use footprint::api::{AppState, router};
use footprint::client::FootprintClient;
use footprint::config::ClientConfig;
use footprint::remote::HttpRemote;
use footprint::session::SqliteSessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Credentials are never logged; session ids only at debug
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("footprint=info".parse()?))
        .init();

    let config = ClientConfig::from_env();

    info!(
        port = config.port,
        api = %config.api_base_url,
        timeout_secs = config.request_timeout.as_secs(),
        "Starting footprint gateway"
    );

    let remote = HttpRemote::new(&config)?;
    let store = SqliteSessionStore::new(&config.session_db_url).await?;
    info!(db_url = %config.session_db_url, "Session store initialized");

    let client = FootprintClient::new(Arc::new(remote), Arc::new(store));
    if client.restore().await?.is_some() {
        info!("Resuming previous session");
    }

    let app = router(AppState {
        client: Arc::new(client),
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Footprint gateway is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
