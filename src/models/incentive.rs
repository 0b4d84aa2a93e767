use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// A discount offered by one specific business location.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Incentive {
    pub id: Uuid,
    pub business_id: Uuid,
    pub categories: Vec<String>, // canonical codes, see models::category
    pub amount: f64,
    pub discount_type: String, // "percentage" or "fixed-amount"
    pub information: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A discount defined once at the chain-parent level and applied to every
/// location of that chain. `is_active` is nullable: older rows predate the
/// flag and count as active unless it is explicitly false.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChainIncentive {
    pub id: Uuid,
    pub chain_id: Uuid,
    pub categories: Vec<String>,
    pub amount: f64,
    pub discount_type: String,
    pub information: String,
    pub is_active: Option<bool>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateIncentiveData {
    pub business_id: Uuid,
    pub categories: Vec<String>,
    pub amount: f64,
    pub discount_type: String,
    pub information: String,
}

impl Incentive {
    /// Creates a new location-specific incentive
    pub async fn create(pool: &PgPool, data: CreateIncentiveData) -> Result<Self, sqlx::Error> {
        let incentive = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO incentives (business_id, categories, amount, discount_type, information)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(data.business_id)
        .bind(&data.categories)
        .bind(data.amount)
        .bind(&data.discount_type)
        .bind(&data.information)
        .fetch_one(pool)
        .await?;

        Ok(incentive)
    }

    /// Finds an incentive by its internal ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let incentive = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM incentives WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(incentive)
    }

    /// Lists all incentives scoped to one business location
    pub async fn list_for_business(
        pool: &PgPool,
        business_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let incentives = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM incentives
            WHERE business_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(business_id)
        .fetch_all(pool)
        .await?;

        Ok(incentives)
    }

    /// Updates an existing incentive's discount fields
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        categories: Option<Vec<String>>,
        amount: Option<f64>,
        discount_type: Option<String>,
        information: Option<String>,
        is_active: Option<bool>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE incentives
            SET
                categories = COALESCE($2, categories),
                amount = COALESCE($3, amount),
                discount_type = COALESCE($4, discount_type),
                information = COALESCE($5, information),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(categories)
        .bind(amount)
        .bind(discount_type)
        .bind(information)
        .bind(is_active)
        .execute(pool)
        .await?;

        Ok(())
    }
}

impl ChainIncentive {
    /// Lists chain-wide incentives for a chain parent.
    ///
    /// Rows are included unless their active flag is explicitly false.
    pub async fn list_for_chain(pool: &PgPool, chain_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let incentives = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM chain_incentives
            WHERE chain_id = $1 AND is_active IS DISTINCT FROM FALSE
            ORDER BY created_at DESC
            "#,
        )
        .bind(chain_id)
        .fetch_all(pool)
        .await?;

        Ok(incentives)
    }
}
