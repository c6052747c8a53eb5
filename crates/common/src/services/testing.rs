//! In-memory database fixtures for service tests

use crate::db::{repository, schema, DbPool};
use sea_orm::{ConnectOptions, Database};
use uuid::Uuid;

/// Fresh SQLite database with the full schema and one tenant
pub(crate) async fn setup() -> (DbPool, Uuid) {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);

    let conn = Database::connect(opts).await.unwrap();
    schema::create_tables(&conn).await.unwrap();
    let tenant = repository::insert_tenant(&conn, "Acme Academy").await.unwrap();

    (DbPool::from_connection(conn), tenant.id)
}
