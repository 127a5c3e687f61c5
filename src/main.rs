use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use smd::config::BootstrapConfig;
use smd::{
    hash_password, Catalog, Config, Database, FileStorage, Ingestor, Role, SessionRegistry,
    SqliteCatalog, User, WebServer,
};

/// Create the configured administrator when no users exist yet.
async fn bootstrap_admin(catalog: &dyn Catalog, bootstrap: &BootstrapConfig) -> smd::Result<()> {
    let (Some(username), Some(password)) = (
        bootstrap.admin_username.as_deref(),
        bootstrap.admin_password.as_deref(),
    ) else {
        return Ok(());
    };

    if !catalog.get_all_users().await?.is_empty() {
        return Ok(());
    }

    let hash = hash_password(password)?;
    let admin = User::new(username, hash, bootstrap.admin_email.clone(), Role::Admin);
    catalog.insert_user(&admin).await?;
    info!(username = %admin.username, "Bootstrap administrator created");
    Ok(())
}

async fn run(config: Config) -> smd::Result<()> {
    let db = Database::open(&config.database.path).await?;
    let catalog: Arc<dyn Catalog> = Arc::new(SqliteCatalog::new(&db));
    bootstrap_admin(catalog.as_ref(), &config.bootstrap).await?;

    let storage = FileStorage::new(&config.storage.root)?;
    info!(
        root = %storage.root().display(),
        max_upload_size = config.storage.max_upload_size,
        "Blob storage ready"
    );

    let ingestor = Ingestor::new(
        Arc::clone(&catalog),
        Arc::new(storage),
        config.storage.max_upload_size,
    );
    let app_state = smd::AppState::new(
        ingestor,
        Arc::new(SessionRegistry::new()),
        Duration::from_secs(config.sessions.duration_secs),
    );

    let sweep_interval = Duration::from_secs(config.sessions.sweep_interval_secs);
    let server = WebServer::new(&config.server, app_state, sweep_interval)?;
    server.run().await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            if let Err(e) = config.apply_env_overrides() {
                eprintln!("Ignoring environment overrides: {e}");
            }
            config
        }
    };

    // Initialize logging
    if let Err(e) = smd::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        smd::logging::init_console_only(&config.logging.level);
    }

    info!("SMD - Simple Media Depot");
    info!(
        "Server configured on {}:{}",
        config.server.host, config.server.port
    );

    if let Err(e) = run(config).await {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
    info!("Server exited");
}
