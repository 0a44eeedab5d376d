//! Vehicle valuation persistence
//!
//! One aggregate row per (make, model, year) group, overwritten whenever a
//! fresh scrape completes. Concurrent refreshes race benignly: the
//! aggregate is recomputed idempotently from the same listing population,
//! so last-writer-wins is acceptable.

use anyhow::Result;
use carval_common::db::models::VehicleValuation;
use carval_common::types::VehicleGroup;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

/// Insert or overwrite the aggregate for a group
pub async fn upsert_for_group(pool: &SqlitePool, valuation: &VehicleValuation) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO vehicle_valuations
            (guid, make, model, year, mean_price, median_price, retail_price,
             sample_size, avg_mileage, computed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(make, model, year) DO UPDATE SET
            mean_price = excluded.mean_price,
            median_price = excluded.median_price,
            retail_price = excluded.retail_price,
            sample_size = excluded.sample_size,
            avg_mileage = excluded.avg_mileage,
            computed_at = excluded.computed_at
        "#,
    )
    .bind(valuation.guid.to_string())
    .bind(&valuation.make)
    .bind(&valuation.model)
    .bind(valuation.year)
    .bind(valuation.mean_price)
    .bind(valuation.median_price)
    .bind(valuation.retail_price)
    .bind(valuation.sample_size)
    .bind(valuation.avg_mileage)
    .bind(valuation.computed_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load the stored aggregate for a group, fresh or not
pub async fn find_for_group(
    pool: &SqlitePool,
    group: &VehicleGroup,
) -> Result<Option<VehicleValuation>> {
    let row = sqlx::query(
        r#"
        SELECT guid, make, model, year, mean_price, median_price, retail_price,
               sample_size, avg_mileage, computed_at
        FROM vehicle_valuations
        WHERE make = ? AND model = ? AND year = ?
        "#,
    )
    .bind(&group.make)
    .bind(&group.model)
    .bind(group.year)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let guid_str: String = row.get("guid");

            Ok(Some(VehicleValuation {
                guid: uuid::Uuid::parse_str(&guid_str)?,
                make: row.get("make"),
                model: row.get("model"),
                year: row.get("year"),
                mean_price: row.get("mean_price"),
                median_price: row.get("median_price"),
                retail_price: row.get("retail_price"),
                sample_size: row.get("sample_size"),
                avg_mileage: row.get("avg_mileage"),
                computed_at: row.get::<DateTime<Utc>, _>("computed_at"),
            }))
        }
        None => Ok(None),
    }
}
