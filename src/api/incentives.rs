use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::middleware::auth::require_auth;
use crate::api::middleware::session::AppState;
use crate::error::{AppError, Result};
use crate::models::business::Business;
use crate::models::category;
use crate::models::incentive::{CreateIncentiveData, Incentive};
use crate::services::incentive_aggregator::{self, AggregatedIncentive};

pub const DISCOUNT_PERCENTAGE: &str = "percentage";
pub const DISCOUNT_FIXED_AMOUNT: &str = "fixed-amount";

// Request/Response types

#[derive(Debug, Serialize)]
pub struct IncentivesResponse {
    pub incentives: Vec<AggregatedIncentive>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateIncentiveRequest {
    pub business_id: Uuid,
    pub categories: Vec<String>,
    pub amount: f64,
    pub discount_type: String,
    pub information: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateIncentiveRequest {
    pub categories: Option<Vec<String>>,
    pub amount: Option<f64>,
    pub discount_type: Option<String>,
    pub information: Option<String>,
    pub is_active: Option<bool>,
}

/// Normalizes an optional description update: omitted means "no change",
/// but an explicit empty string is a validation error, matching the
/// required-description rule on create.
fn normalize_information(information: Option<String>) -> Result<Option<String>> {
    match information {
        Some(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Err(AppError::Validation(
                    "Incentive description cannot be empty".to_string(),
                ));
            }
            Ok(Some(trimmed.to_string()))
        }
        None => Ok(None),
    }
}

fn validate_discount(amount: f64, discount_type: &str) -> Result<()> {
    match discount_type {
        DISCOUNT_PERCENTAGE => {
            if !(0.0..=100.0).contains(&amount) {
                return Err(AppError::Validation(
                    "Percentage discount must be between 0 and 100".to_string(),
                ));
            }
        }
        DISCOUNT_FIXED_AMOUNT => {
            if amount < 0.0 || !amount.is_finite() {
                return Err(AppError::Validation(
                    "Fixed discount amount must be non-negative".to_string(),
                ));
            }
        }
        other => {
            return Err(AppError::Validation(format!(
                "Unknown discount type: {}",
                other
            )));
        }
    }
    Ok(())
}

// Handlers

/// Load the merged incentive view for one business: location-specific
/// incentives plus, for chain locations, the chain-wide set.
///
/// A chain fetch failure degrades to local-only results inside the
/// aggregator. A local fetch failure surfaces as a structured 503 body
/// with an empty list, never an unhandled error.
async fn list_incentives(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let business = match Business::find_by_id(&state.pool, id).await {
        Ok(Some(business)) => business,
        Ok(None) => return AppError::NotFound("Business not found".to_string()).into_response(),
        Err(e) => return AppError::Database(e).into_response(),
    };

    match incentive_aggregator::load_for_business(&state.pool, &business).await {
        Ok(incentives) => {
            let message = if incentives.is_empty() {
                "No incentives found for this business".to_string()
            } else {
                format!("{} incentive(s) found", incentives.len())
            };
            Json(IncentivesResponse {
                incentives,
                message,
            })
            .into_response()
        }
        Err(e) => {
            tracing::error!(business_id = %business.id, error = %e, "Incentive fetch failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(IncentivesResponse {
                    incentives: Vec::new(),
                    message: "Unable to load incentives right now. Please retry.".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Create a location-specific incentive
async fn create_incentive(
    State(state): State<AppState>,
    Json(body): Json<CreateIncentiveRequest>,
) -> Result<(StatusCode, Json<Incentive>)> {
    let categories = category::normalize_categories(&body.categories)
        .map_err(AppError::Validation)?;
    validate_discount(body.amount, &body.discount_type)?;

    if body.information.trim().is_empty() {
        return Err(AppError::Validation(
            "Incentive description is required".to_string(),
        ));
    }

    let business = Business::find_by_id(&state.pool, body.business_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Business not found".to_string()))?;

    if business.is_chain {
        return Err(AppError::Validation(
            "Location incentives cannot be attached to a chain parent".to_string(),
        ));
    }

    let incentive = Incentive::create(
        &state.pool,
        CreateIncentiveData {
            business_id: business.id,
            categories,
            amount: body.amount,
            discount_type: body.discount_type,
            information: body.information.trim().to_string(),
        },
    )
    .await?;

    tracing::info!(
        incentive_id = %incentive.id,
        business_id = %business.id,
        "Created incentive"
    );

    Ok((StatusCode::CREATED, Json(incentive)))
}

/// Update an existing location incentive
async fn update_incentive(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateIncentiveRequest>,
) -> Result<Json<serde_json::Value>> {
    let existing = Incentive::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Incentive not found".to_string()))?;

    let categories = match &body.categories {
        Some(codes) => Some(category::normalize_categories(codes).map_err(AppError::Validation)?),
        None => None,
    };

    let information = normalize_information(body.information)?;

    if body.amount.is_some() || body.discount_type.is_some() {
        let amount = body.amount.unwrap_or(existing.amount);
        let discount_type = body
            .discount_type
            .as_deref()
            .unwrap_or(&existing.discount_type);
        validate_discount(amount, discount_type)?;
    }

    Incentive::update(
        &state.pool,
        existing.id,
        categories,
        body.amount,
        body.discount_type,
        information,
        body.is_active,
    )
    .await?;

    tracing::info!(incentive_id = %existing.id, "Updated incentive");

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Incentive updated",
    })))
}

pub fn router() -> Router<AppState> {
    let authed_routes = Router::new()
        .route("/incentives", post(create_incentive))
        .route("/incentives/:id", put(update_incentive))
        .route_layer(middleware::from_fn(require_auth));

    Router::new()
        .route("/businesses/:id/incentives", get(list_incentives))
        .merge(authed_routes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_omitted_information_means_no_change() {
        assert_eq!(normalize_information(None).unwrap(), None);
    }

    #[test]
    fn test_information_is_trimmed() {
        assert_eq!(
            normalize_information(Some("  10% off entrees  ".to_string())).unwrap(),
            Some("10% off entrees".to_string())
        );
    }

    #[test]
    fn test_explicit_empty_information_rejected() {
        let err = normalize_information(Some("   ".to_string())).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_discount_bounds() {
        assert!(validate_discount(50.0, DISCOUNT_PERCENTAGE).is_ok());
        assert!(validate_discount(101.0, DISCOUNT_PERCENTAGE).is_err());
        assert!(validate_discount(5.0, DISCOUNT_FIXED_AMOUNT).is_ok());
        assert!(validate_discount(-1.0, DISCOUNT_FIXED_AMOUNT).is_err());
        assert!(validate_discount(10.0, "bogo").is_err());
    }
}
