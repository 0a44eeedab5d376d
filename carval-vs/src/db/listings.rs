//! Vehicle listing persistence
//!
//! Listings are append-only market observations; the retention cleanup
//! pass is the only thing that ever removes them.

use anyhow::Result;
use carval_common::db::models::VehicleListing;
use carval_common::types::VehicleGroup;
use chrono::{DateTime, Duration, Utc};
use sqlx::{Row, SqlitePool};

/// Insert a batch of scraped listings
pub async fn insert_batch(pool: &SqlitePool, listings: &[VehicleListing]) -> Result<()> {
    for listing in listings {
        sqlx::query(
            r#"
            INSERT INTO vehicle_listings
                (guid, make, model, year, source, price, mileage, city, state,
                 listing_url, observed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(listing.guid.to_string())
        .bind(&listing.make)
        .bind(&listing.model)
        .bind(listing.year)
        .bind(&listing.source)
        .bind(listing.price)
        .bind(listing.mileage)
        .bind(&listing.city)
        .bind(&listing.state)
        .bind(&listing.listing_url)
        .bind(listing.observed_at)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Load recent listings for a comparables group.
///
/// Only listings observed within the window feed an aggregate; older rows
/// are ignored here even before the retention pass removes them.
pub async fn recent_for_group(
    pool: &SqlitePool,
    group: &VehicleGroup,
    window_days: i64,
) -> Result<Vec<VehicleListing>> {
    let cutoff = Utc::now() - Duration::days(window_days);

    let rows = sqlx::query(
        r#"
        SELECT guid, make, model, year, source, price, mileage, city, state,
               listing_url, observed_at
        FROM vehicle_listings
        WHERE make = ? AND model = ? AND year = ? AND observed_at >= ?
        ORDER BY observed_at DESC
        "#,
    )
    .bind(&group.make)
    .bind(&group.model)
    .bind(group.year)
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(|row| row_to_listing(&row)).collect()
}

/// Delete listings older than the retention cutoff; returns rows purged
pub async fn delete_older_than(pool: &SqlitePool, cutoff: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM vehicle_listings WHERE observed_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

fn row_to_listing(row: &sqlx::sqlite::SqliteRow) -> Result<VehicleListing> {
    let guid_str: String = row.get("guid");

    Ok(VehicleListing {
        guid: uuid::Uuid::parse_str(&guid_str)?,
        make: row.get("make"),
        model: row.get("model"),
        year: row.get("year"),
        source: row.get("source"),
        price: row.get("price"),
        mileage: row.get("mileage"),
        city: row.get("city"),
        state: row.get("state"),
        listing_url: row.get("listing_url"),
        observed_at: row.get::<DateTime<Utc>, _>("observed_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        carval_common::db::init::create_vehicle_listings_table(&pool)
            .await
            .unwrap();
        pool
    }

    fn listing(price: f64, observed_at: DateTime<Utc>) -> VehicleListing {
        VehicleListing {
            guid: Uuid::new_v4(),
            make: "Toyota".to_string(),
            model: "Camry".to_string(),
            year: 2020,
            source: "cars_com".to_string(),
            price,
            mileage: Some(40_000),
            city: Some("Columbus".to_string()),
            state: Some("OH".to_string()),
            listing_url: None,
            observed_at,
        }
    }

    #[tokio::test]
    async fn insert_and_read_recent() {
        let pool = test_pool().await;
        let group = VehicleGroup::new("Toyota", "Camry", 2020);

        insert_batch(
            &pool,
            &[listing(21_000.0, Utc::now()), listing(19_500.0, Utc::now())],
        )
        .await
        .unwrap();

        let recent = recent_for_group(&pool, &group, 60).await.unwrap();
        assert_eq!(recent.len(), 2);
    }

    #[tokio::test]
    async fn window_excludes_old_listings() {
        let pool = test_pool().await;
        let group = VehicleGroup::new("Toyota", "Camry", 2020);

        insert_batch(
            &pool,
            &[
                listing(21_000.0, Utc::now()),
                listing(18_000.0, Utc::now() - Duration::days(90)),
            ],
        )
        .await
        .unwrap();

        let recent = recent_for_group(&pool, &group, 60).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].price, 21_000.0);
    }

    #[tokio::test]
    async fn other_groups_are_not_returned() {
        let pool = test_pool().await;

        let mut other = listing(30_000.0, Utc::now());
        other.model = "Corolla".to_string();
        insert_batch(&pool, &[listing(21_000.0, Utc::now()), other])
            .await
            .unwrap();

        let group = VehicleGroup::new("Toyota", "Camry", 2020);
        let recent = recent_for_group(&pool, &group, 60).await.unwrap();
        assert_eq!(recent.len(), 1);
    }

    #[tokio::test]
    async fn retention_deletes_only_expired_rows() {
        let pool = test_pool().await;

        insert_batch(
            &pool,
            &[
                listing(21_000.0, Utc::now()),
                listing(18_000.0, Utc::now() - Duration::days(120)),
                listing(17_500.0, Utc::now() - Duration::days(100)),
            ],
        )
        .await
        .unwrap();

        let purged = delete_older_than(&pool, Utc::now() - Duration::days(90))
            .await
            .unwrap();
        assert_eq!(purged, 2);

        let group = VehicleGroup::new("Toyota", "Camry", 2020);
        let remaining = recent_for_group(&pool, &group, 365).await.unwrap();
        assert_eq!(remaining.len(), 1);
    }
}
