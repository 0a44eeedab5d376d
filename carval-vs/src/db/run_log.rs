//! Scraper run log persistence
//!
//! Append-only; read by operators, not by the resolution path.

use anyhow::Result;
use carval_common::db::models::ScraperRunLog;
use sqlx::SqlitePool;

/// Record one adapter invocation's outcome
pub async fn record(pool: &SqlitePool, entry: &ScraperRunLog) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO scraper_run_log
            (guid, source, make, model, year, items_found, items_skipped,
             outcome, message, started_at, finished_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.guid.to_string())
    .bind(&entry.source)
    .bind(&entry.make)
    .bind(&entry.model)
    .bind(entry.year)
    .bind(entry.items_found)
    .bind(entry.items_skipped)
    .bind(entry.outcome.as_str())
    .bind(&entry.message)
    .bind(entry.started_at)
    .bind(entry.finished_at)
    .execute(pool)
    .await?;

    Ok(())
}
