//! PostgreSQL datasource: pool, migrations and schema validation.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::DataSourceConfig;

/// Migrations embedded at compile time, applied in order.
const MIGRATIONS: &[(&str, &str)] = &[(
    "001_platform_meta",
    include_str!("../migrations/001_platform_meta.sql"),
)];

/// Tables the migrations are expected to leave behind.
const EXPECTED_TABLES: &[&str] = &["platform_meta"];

/// Open a connection pool. Fails if the database does not accept a
/// connection.
pub async fn connect(config: &DataSourceConfig) -> Result<PgPool, sqlx::Error> {
    let options = config
        .connect_options()
        .map_err(|e| sqlx::Error::Configuration(Box::new(e)))?;
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
}

/// Apply the embedded migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("running database migrations");
    for (name, sql) in MIGRATIONS {
        sqlx::raw_sql(sql).execute(pool).await?;
        tracing::debug!(migration = name, "migration applied");
    }
    tracing::info!("migrations complete");
    Ok(())
}

/// Check that every expected table exists. Returns the missing ones.
pub async fn validate_schema(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    let mut missing = Vec::new();
    for table in EXPECTED_TABLES {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = $1)",
        )
        .bind(*table)
        .fetch_one(pool)
        .await?;
        if !exists {
            missing.push((*table).to_string());
        }
    }
    Ok(missing)
}

/// `SELECT 1` round trip used by the health endpoint.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await
        .map(|_| ())
}
