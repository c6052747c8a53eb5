//! Persistence gateway for TalentForge
//!
//! Provides:
//! - SeaORM entity models
//! - Tenant-scoped repository helpers
//! - Connection pool management
//! - Schema bootstrap from the entity definitions

pub mod models;
pub mod repository;
pub mod schema;

pub use repository::TenantScoped;

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction,
    TransactionTrait,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Database connection pool wrapper
///
/// Connections sit behind `Arc` since `DatabaseConnection` is not `Clone`
/// once the mock backend is compiled in.
#[derive(Clone)]
pub struct DbPool {
    /// Primary connection (for writes)
    pub primary: Arc<DatabaseConnection>,

    /// Read replica connection (optional)
    pub replica: Option<Arc<DatabaseConnection>>,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to primary database...");

        let primary = connect(&config.url, config)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect to primary: {}", e),
            })?;

        let replica = match config.read_url {
            Some(ref read_url) => {
                info!("Connecting to read replica...");
                let replica_conn = connect(read_url, config)
                    .await
                    .map_err(|e| AppError::DatabaseConnection {
                        message: format!("Failed to connect to replica: {}", e),
                    })?;
                Some(Arc::new(replica_conn))
            }
            None => None,
        };

        info!("Database connections established");

        Ok(Self {
            primary: Arc::new(primary),
            replica,
        })
    }

    /// Wrap an already open connection, used for tests and tooling
    pub fn from_connection(primary: DatabaseConnection) -> Self {
        Self {
            primary: Arc::new(primary),
            replica: None,
        }
    }

    /// Get the connection for reads (replica if available, otherwise primary)
    pub fn read(&self) -> &DatabaseConnection {
        self.replica.as_deref().unwrap_or(&*self.primary)
    }

    /// Get the connection for writes (always primary)
    pub fn write(&self) -> &DatabaseConnection {
        &*self.primary
    }

    /// Start a transaction on the primary
    pub async fn begin(&self) -> Result<DatabaseTransaction> {
        self.primary.begin().await.map_err(Into::into)
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.primary
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Primary ping failed: {}", e),
            })?;

        if let Some(ref replica) = self.replica {
            replica
                .execute_unprepared("SELECT 1")
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Replica ping failed: {}", e),
                })?;
        }

        Ok(())
    }
}

async fn connect(
    url: &str,
    config: &DatabaseConfig,
) -> std::result::Result<DatabaseConnection, sea_orm::DbErr> {
    let mut opts = ConnectOptions::new(url);
    opts.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(true);

    Database::connect(opts).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, MockDatabase};

    #[test]
    fn test_clones_share_the_primary() {
        let pool = DbPool::from_connection(MockDatabase::new(DbBackend::Postgres).into_connection());
        let clone = pool.clone();

        assert!(Arc::ptr_eq(&pool.primary, &clone.primary));
        assert!(std::ptr::eq(pool.read(), pool.write()));

        drop(clone);
        let Ok(conn) = Arc::try_unwrap(pool.primary) else {
            panic!("primary still shared");
        };
        assert!(conn.into_transaction_log().is_empty());
    }
}
