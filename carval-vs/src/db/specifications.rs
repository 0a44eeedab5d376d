//! Vehicle specification persistence

use anyhow::Result;
use carval_common::db::models::VehicleSpecification;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

/// Persist a decoded specification.
///
/// Rows are immutable once written: a VIN decoded twice keeps its first
/// decode, so `INSERT OR IGNORE` is the whole write path.
pub async fn insert_ignore(pool: &SqlitePool, spec: &VehicleSpecification) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO vehicle_specifications
            (vin, make, model, year, trim, body_type, decoded_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&spec.vin)
    .bind(&spec.make)
    .bind(&spec.model)
    .bind(spec.year)
    .bind(&spec.trim)
    .bind(&spec.body_type)
    .bind(spec.decoded_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a specification by VIN
pub async fn get_by_vin(pool: &SqlitePool, vin: &str) -> Result<Option<VehicleSpecification>> {
    let row = sqlx::query(
        r#"
        SELECT vin, make, model, year, trim, body_type, decoded_at
        FROM vehicle_specifications
        WHERE vin = ?
        "#,
    )
    .bind(vin)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| VehicleSpecification {
        vin: row.get("vin"),
        make: row.get("make"),
        model: row.get("model"),
        year: row.get("year"),
        trim: row.get("trim"),
        body_type: row.get("body_type"),
        decoded_at: row.get::<DateTime<Utc>, _>("decoded_at"),
    }))
}
