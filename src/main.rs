use dotenvy::dotenv;
use larder::{
    api::{self, AppState},
    config::{database, server::ServerConfig, tags},
    core::tag,
    errors::Result,
};
use std::path::Path;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Creates the parent directory of a file-backed `SQLite` URL.
fn ensure_sqlite_dir(database_url: &str) -> Result<()> {
    let Some(rest) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let file = rest.split('?').next().unwrap_or_default();
    if let Some(parent) = Path::new(file).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Server settings
    let settings = ServerConfig::from_env();
    std::fs::create_dir_all(&settings.media_root)?;

    // 4. Initialize database
    let database_url = database::get_database_url();
    ensure_sqlite_dir(&database_url)?;
    let db = database::create_connection(&database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Seed the tag catalog
    let tag_config = tags::load_default_config()?;
    tag::seed_tags(&db, &tag_config.tags)
        .await
        .inspect_err(|e| error!("Failed to seed tags: {}", e))?;

    // 6. Serve
    let listener = TcpListener::bind(&settings.bind_address)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", settings.bind_address, e))?;
    info!("Binding to {}", settings.bind_address);

    api::serve(listener, AppState::new(db, settings)).await
}
