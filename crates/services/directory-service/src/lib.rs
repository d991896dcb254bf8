//! Directory Service Library
//!
//! A user directory over a single collection of records: validated
//! create/read/update/delete/list/drop served over HTTP. The store is
//! Postgres through SeaORM, or an in-process map for `memory://` URLs.

pub mod api;
pub mod config;
pub mod infra;
pub mod repository;
pub mod service;
pub mod validation;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use domain::UserSchema;

use crate::api::{create_router, AppState};
use crate::config::DirectoryConfig;
use crate::infra::Database;
use crate::repository::{MemoryStore, UserRepository, UserStore};
use crate::service::UserManager;

/// Run migrations (for CLI commands).
pub async fn run_migrations(
    config: &DirectoryConfig,
    action: MigrateAction,
) -> Result<(), Box<dyn std::error::Error>> {
    if config.database.is_memory() {
        return Err("the in-memory store has no migrations".into());
    }
    let db = Database::connect_without_migrations(&config.database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

/// Load the user schema from the configured file, or fall back to the
/// built-in definition.
pub fn load_schema(config: &DirectoryConfig) -> Result<UserSchema, domain::DomainError> {
    match &config.schema_path {
        Some(path) => {
            let schema = UserSchema::load(path)?;
            info!(path = %path.display(), required = ?schema.required(), "User schema loaded");
            Ok(schema)
        }
        None => Ok(UserSchema::default()),
    }
}

/// Pick the store named by the database URL.
async fn open_repository(
    config: &DirectoryConfig,
) -> Result<Arc<dyn UserRepository>, Box<dyn std::error::Error>> {
    if config.database.is_memory() {
        info!("Using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let db = Database::connect(&config.database).await?;
    Ok(Arc::new(UserStore::new(db.get_connection())))
}

/// Build the router with every dependency wired from the configuration.
pub async fn build_app(config: &DirectoryConfig) -> Result<axum::Router, Box<dyn std::error::Error>> {
    let schema = Arc::new(load_schema(config)?);
    let repository = open_repository(config).await?;

    let user_service = Arc::new(
        UserManager::new(repository.clone(), schema.required().to_vec())
            .with_timeout(config.database.timeout()),
    );

    let state = AppState::new(user_service, schema, repository)
        .with_store_timeout(config.database.timeout());
    Ok(create_router(state, &config.web_base))
}

/// Run the HTTP server with the given configuration.
pub async fn run_server_with_config(
    config: DirectoryConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_app(&config).await?;

    let addr: SocketAddr = config.service.bind_addr().parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(
        "{} listening on {} (routes under '{}')",
        config.service.service_name, addr, config.web_base
    );

    axum::serve(listener, app).await?;

    Ok(())
}
