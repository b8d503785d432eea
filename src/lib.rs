pub mod config;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod patient;
pub mod doctor;
pub mod appointment;

use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

pub use error::HospitalError;

/// Install the global `tracing` subscriber.
///
/// Honours `RUST_LOG`, falling back to `config::default_log_filter()`.
/// Calling it again after a subscriber is installed is a no-op.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}

/// Open the records database under the application data directory,
/// creating the directory and applying migrations as needed.
pub fn open_default_database() -> Result<Connection, db::DatabaseError> {
    let path = config::database_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!("{} v{} opening {}", config::APP_NAME, config::APP_VERSION, path.display());
    db::open_database(&path)
}
