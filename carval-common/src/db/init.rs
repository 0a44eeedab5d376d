//! Database initialization
//!
//! Creates the database on first run and brings the schema up idempotently
//! with `CREATE TABLE IF NOT EXISTS` (safe to call at every startup).

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL mode: concurrent readers with one writer, needed when a scrape
    // job and a resolver call overlap on the same database
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    // Idempotent schema creation
    create_vehicle_specifications_table(&pool).await?;
    create_vehicle_listings_table(&pool).await?;
    create_vehicle_valuations_table(&pool).await?;
    create_scraper_run_log_table(&pool).await?;

    Ok(pool)
}

/// Decoded VIN attributes; one immutable row per VIN
pub async fn create_vehicle_specifications_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vehicle_specifications (
            vin TEXT PRIMARY KEY,
            make TEXT NOT NULL,
            model TEXT NOT NULL,
            year INTEGER NOT NULL,
            trim TEXT,
            body_type TEXT,
            decoded_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Scraped market comparables, keyed by (make, model, year) group
pub async fn create_vehicle_listings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vehicle_listings (
            guid TEXT PRIMARY KEY,
            make TEXT NOT NULL,
            model TEXT NOT NULL,
            year INTEGER NOT NULL,
            source TEXT NOT NULL,
            price REAL NOT NULL,
            mileage INTEGER,
            city TEXT,
            state TEXT,
            listing_url TEXT,
            observed_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_listings_group
         ON vehicle_listings (make, model, year)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_listings_observed_at
         ON vehicle_listings (observed_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Derived aggregates, one row per group, overwritten on recompute
pub async fn create_vehicle_valuations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vehicle_valuations (
            guid TEXT PRIMARY KEY,
            make TEXT NOT NULL,
            model TEXT NOT NULL,
            year INTEGER NOT NULL,
            mean_price REAL NOT NULL,
            median_price REAL NOT NULL,
            retail_price REAL NOT NULL,
            sample_size INTEGER NOT NULL CHECK (sample_size >= 1),
            avg_mileage REAL,
            computed_at TIMESTAMP NOT NULL,
            UNIQUE (make, model, year)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Append-only scrape observability log
pub async fn create_scraper_run_log_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scraper_run_log (
            guid TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            make TEXT NOT NULL,
            model TEXT NOT NULL,
            year INTEGER,
            items_found INTEGER NOT NULL DEFAULT 0,
            items_skipped INTEGER NOT NULL DEFAULT 0,
            outcome TEXT NOT NULL,
            message TEXT,
            started_at TIMESTAMP NOT NULL,
            finished_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_run_log_source
         ON scraper_run_log (source, started_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn init_creates_schema() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("carval.db");

        let pool = init_database(&db_path).await.expect("init failed");

        // All four tables exist and are queryable
        for table in [
            "vehicle_specifications",
            "vehicle_listings",
            "vehicle_valuations",
            "scraper_run_log",
        ] {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&pool)
                .await
                .unwrap_or_else(|_| panic!("table {} missing", table));
            assert_eq!(count, 0);
        }
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("carval.db");

        let pool = init_database(&db_path).await.expect("first init failed");
        pool.close().await;

        // Second open against the same file must not fail
        let pool = init_database(&db_path).await.expect("second init failed");
        pool.close().await;
    }

    #[tokio::test]
    async fn valuation_sample_size_invariant() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("carval.db");
        let pool = init_database(&db_path).await.expect("init failed");

        // sample_size = 0 violates the CHECK constraint
        let result = sqlx::query(
            r#"
            INSERT INTO vehicle_valuations
                (guid, make, model, year, mean_price, median_price, retail_price,
                 sample_size, computed_at)
            VALUES ('g1', 'Toyota', 'Camry', 2020, 1.0, 1.0, 1.0, 0, CURRENT_TIMESTAMP)
            "#,
        )
        .execute(&pool)
        .await;

        assert!(result.is_err(), "sample_size = 0 must be rejected");
    }
}
