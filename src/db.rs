//! Database connection management
//!
//! Builds the connection pools for the two live sides and the snapshot
//! workspace. The live sides are read-only consumers; the engine never
//! issues writes against them.

use crate::config::DatabaseConfig;
use crate::error::EngineError;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
use tracing::debug;

/// Create a connection pool with given configuration
pub fn create_pool(config: &DatabaseConfig) -> Result<Pool, EngineError> {
    let mut cfg = Config::new();
    cfg.host = Some(config.host.clone());
    cfg.port = Some(config.port);
    cfg.user = Some(config.user.clone());
    cfg.password = Some(config.password.clone());
    cfg.dbname = Some(config.database.clone());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| EngineError::Config(format!("Failed to create pool: {}", e)))
}

/// Verify a pool can hand out a working connection
pub async fn ping(pool: &Pool, name: &str) -> Result<(), EngineError> {
    let client = pool.get().await?;
    client.query_one("SELECT 1", &[]).await?;
    debug!("Connection verified for {}", name);
    Ok(())
}
