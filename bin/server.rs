// Split Bill - Web Server
// REST API with Axum over the SQLite expense store

use anyhow::{Context, Result};
use split_bill::api::{router, AppState};
use split_bill::{logging, Config, SqliteExpenseStore};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init("info");

    let config = Config::from_env().context("Failed to load configuration")?;

    let store = SqliteExpenseStore::open(&config.database_path, config.participants.clone())
        .with_context(|| format!("Failed to open database {}", config.database_path.display()))?;
    info!(
        database = %config.database_path.display(),
        participants = ?config.participants,
        "expense store ready"
    );

    let app = router(AppState::new(store));

    let listener = tokio::net::TcpListener::bind(config.server_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server_addr))?;

    info!("🚀 Server running on http://{}", config.server_addr);
    info!("   API: http://{}/api/expenses", config.server_addr);

    axum::serve(listener, app)
        .await
        .context("Server stopped unexpectedly")?;

    Ok(())
}
