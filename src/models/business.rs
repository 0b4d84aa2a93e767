use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_INACTIVE: &str = "inactive";

/// Valid values for the soft status field; businesses are deactivated,
/// never hard-deleted.
pub fn is_valid_status(status: &str) -> bool {
    status == STATUS_ACTIVE || status == STATUS_INACTIVE
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Business {
    pub id: Uuid,
    pub name: String,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub place_id: Option<String>, // external place identifier, assigned by admin
    pub chain_id: Option<Uuid>,   // set when this location belongs to a chain
    pub is_chain: bool,           // true for chain parent records only
    pub status: String,           // "active", "inactive" (soft delete, never hard-deleted)
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateBusinessData {
    pub name: String,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub chain_id: Option<Uuid>,
    pub is_chain: bool,
}

impl Business {
    /// Creates a new business record.
    ///
    /// A record is a standalone location, a chain parent, or a chain
    /// location; `is_chain` and `chain_id` are mutually exclusive and
    /// callers validate that before reaching here.
    pub async fn create(pool: &PgPool, data: CreateBusinessData) -> Result<Self, sqlx::Error> {
        let business = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO businesses (
                name, address1, address2, city, state, zip,
                lat, lng, chain_id, is_chain
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.address1)
        .bind(&data.address2)
        .bind(&data.city)
        .bind(&data.state)
        .bind(&data.zip)
        .bind(data.lat)
        .bind(data.lng)
        .bind(data.chain_id)
        .bind(data.is_chain)
        .fetch_one(pool)
        .await?;

        Ok(business)
    }

    /// Finds a business by its internal ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let business = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM businesses WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(business)
    }

    /// Searches active businesses by name or city (case-insensitive)
    pub async fn search(pool: &PgPool, query: &str, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        let pattern = format!("%{}%", query);
        let businesses = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM businesses
            WHERE status = 'active' AND (name ILIKE $1 OR city ILIKE $1)
            ORDER BY name
            LIMIT $2
            "#,
        )
        .bind(&pattern)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(businesses)
    }

    /// Assigns the external place identifier chosen during duplicate review
    pub async fn assign_place_id(
        pool: &PgPool,
        id: Uuid,
        place_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE businesses
            SET place_id = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(place_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Updates the soft status field ("active"/"inactive")
    pub async fn set_status(pool: &PgPool, id: Uuid, status: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE businesses
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_values() {
        assert!(is_valid_status(STATUS_ACTIVE));
        assert!(is_valid_status(STATUS_INACTIVE));
        assert!(!is_valid_status("deleted"));
        assert!(!is_valid_status(""));
    }
}
