use std::collections::HashMap;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::api::middleware::auth::{get_authenticated_user, require_admin};
use crate::api::middleware::session::AppState;
use crate::error::{AppError, Result};
use crate::models::business::{self, Business, CreateBusinessData};
use crate::services::place_match::{self, ScoredCandidate};
use crate::services::place_search::{self, BatchLookup, MAX_BATCH_LOOKUPS};

fn places_config(config: &crate::config::Config) -> Result<(String, String)> {
    let url = config
        .places_api_url
        .clone()
        .ok_or(place_search::PlaceSearchError::MissingConfig)?;
    let key = config
        .places_api_key
        .as_ref()
        .ok_or(place_search::PlaceSearchError::MissingConfig)?
        .expose_secret()
        .clone();
    Ok((url, key))
}

fn places_timeout(config: &crate::config::Config) -> Duration {
    Duration::from_secs(
        config
            .places_timeout_secs
            .unwrap_or(place_search::DEFAULT_TIMEOUT_SECS),
    )
}

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct CreateBusinessRequest {
    pub name: String,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub chain_id: Option<Uuid>,
    #[serde(default)]
    pub is_chain: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PlaceSearchRequest {
    /// Echoed back untouched so the client can discard responses from
    /// superseded searches.
    pub generation: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlaceSearchResponse {
    pub matches: Vec<ScoredCandidate>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BatchPlaceSearchRequest {
    pub business_ids: Vec<Uuid>,
    pub generation: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchPlaceSearchItem {
    pub business_id: Uuid,
    pub success: bool,
    pub matches: Vec<ScoredCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchPlaceSearchResponse {
    pub results: Vec<BatchPlaceSearchItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignPlaceRequest {
    pub place_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

// Handlers

/// Create a business record (standalone location, chain parent, or
/// chain location)
async fn create_business(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CreateBusinessRequest>,
) -> Result<(StatusCode, Json<Business>)> {
    get_authenticated_user(&session)
        .await
        .map_err(|_| AppError::Unauthorized)?;

    for (field, value) in [
        ("name", &body.name),
        ("address1", &body.address1),
        ("city", &body.city),
        ("state", &body.state),
        ("zip", &body.zip),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("Field '{}' is required", field)));
        }
    }

    // A record is a chain parent or a chain location, never both
    if body.is_chain && body.chain_id.is_some() {
        return Err(AppError::Validation(
            "A chain parent cannot itself belong to a chain".to_string(),
        ));
    }

    if let Some(chain_id) = body.chain_id {
        let parent = Business::find_by_id(&state.pool, chain_id)
            .await?
            .ok_or_else(|| AppError::Validation("Referenced chain does not exist".to_string()))?;
        if !parent.is_chain {
            return Err(AppError::Validation(
                "Referenced business is not a chain parent".to_string(),
            ));
        }
    }

    let business = Business::create(
        &state.pool,
        CreateBusinessData {
            name: body.name.trim().to_string(),
            address1: body.address1.trim().to_string(),
            address2: body.address2.filter(|s| !s.trim().is_empty()),
            city: body.city.trim().to_string(),
            state: body.state.trim().to_string(),
            zip: body.zip.trim().to_string(),
            lat: body.lat,
            lng: body.lng,
            chain_id: body.chain_id,
            is_chain: body.is_chain,
        },
    )
    .await?;

    tracing::info!(business_id = %business.id, is_chain = business.is_chain, "Created business");

    Ok((StatusCode::CREATED, Json(business)))
}

/// Search active businesses by name or city
async fn search_businesses(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Business>>> {
    if query.q.trim().is_empty() {
        return Err(AppError::Validation("Search term is required".to_string()));
    }

    let limit = query.limit.unwrap_or(25).clamp(1, 100);
    let businesses = Business::search(&state.pool, query.q.trim(), limit).await?;

    Ok(Json(businesses))
}

/// Fetch a single business
async fn get_business(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Business>> {
    let business = Business::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Business not found".to_string()))?;

    Ok(Json(business))
}

/// Search the place service for duplicate candidates of one business,
/// scored and ranked best-first. A human always confirms the match; no
/// threshold auto-assigns.
async fn place_search_business(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<PlaceSearchRequest>,
) -> Result<Json<PlaceSearchResponse>> {
    let business = Business::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Business not found".to_string()))?;

    let (api_url, api_key) = places_config(&state.config)?;
    let query = place_search::build_query(&business);
    let bias = match (business.lat, business.lng) {
        (Some(lat), Some(lng)) => Some((lat, lng)),
        _ => None,
    };

    let candidates =
        place_search::search_places(&api_url, &api_key, &query, bias, places_timeout(&state.config))
            .await?;

    let matches = place_match::rank_candidates(&business, candidates);

    let message = if matches.is_empty() {
        "No matching places found. Adjust the business name or address and retry.".to_string()
    } else {
        format!("{} candidate(s) found", matches.len())
    };

    tracing::info!(
        business_id = %business.id,
        candidates = matches.len(),
        "Place match search completed"
    );

    Ok(Json(PlaceSearchResponse {
        matches,
        message,
        generation: body.generation,
    }))
}

/// Batch duplicate search over up to 10 businesses.
///
/// Oversized batches are rejected before any network call; individual
/// lookup failures are reported per item.
async fn batch_place_search(
    State(state): State<AppState>,
    Json(body): Json<BatchPlaceSearchRequest>,
) -> Result<Json<BatchPlaceSearchResponse>> {
    if body.business_ids.is_empty() {
        return Err(AppError::Validation(
            "At least one business is required".to_string(),
        ));
    }
    if body.business_ids.len() > MAX_BATCH_LOOKUPS {
        return Err(AppError::Validation(format!(
            "Batch is limited to {} businesses (got {})",
            MAX_BATCH_LOOKUPS,
            body.business_ids.len()
        )));
    }

    let (api_url, api_key) = places_config(&state.config)?;

    let mut results = Vec::with_capacity(body.business_ids.len());
    let mut businesses: HashMap<Uuid, Business> = HashMap::new();
    let mut lookups = Vec::new();

    for id in &body.business_ids {
        match Business::find_by_id(&state.pool, *id).await? {
            Some(business) => {
                lookups.push(BatchLookup {
                    business_id: business.id,
                    query: place_search::build_query(&business),
                    bias: match (business.lat, business.lng) {
                        (Some(lat), Some(lng)) => Some((lat, lng)),
                        _ => None,
                    },
                });
                businesses.insert(business.id, business);
            }
            None => results.push(BatchPlaceSearchItem {
                business_id: *id,
                success: false,
                matches: Vec::new(),
                message: Some("Business not found".to_string()),
            }),
        }
    }

    let lookup_results =
        place_search::batch_search(&api_url, &api_key, places_timeout(&state.config), lookups)
            .await?;

    for item in lookup_results {
        let entry = match item.result {
            Ok(candidates) => {
                // Lookup order mirrors insertion, so the map always has it
                let matches = businesses
                    .get(&item.business_id)
                    .map(|b| place_match::rank_candidates(b, candidates))
                    .unwrap_or_default();
                BatchPlaceSearchItem {
                    business_id: item.business_id,
                    success: true,
                    matches,
                    message: None,
                }
            }
            Err(message) => BatchPlaceSearchItem {
                business_id: item.business_id,
                success: false,
                matches: Vec::new(),
                message: Some(message),
            },
        };
        results.push(entry);
    }

    Ok(Json(BatchPlaceSearchResponse {
        results,
        generation: body.generation,
    }))
}

/// Assign the external place identifier an admin confirmed
async fn assign_place(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AssignPlaceRequest>,
) -> Result<Json<serde_json::Value>> {
    if body.place_id.trim().is_empty() {
        return Err(AppError::Validation("place_id is required".to_string()));
    }

    let business = Business::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Business not found".to_string()))?;

    Business::assign_place_id(&state.pool, business.id, body.place_id.trim()).await?;

    tracing::info!(
        business_id = %business.id,
        place_id = %body.place_id.trim(),
        "Assigned place identifier"
    );

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Place identifier assigned",
    })))
}

/// Soft-activate or deactivate a business; records are never hard-deleted
async fn set_business_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SetStatusRequest>,
) -> Result<Json<serde_json::Value>> {
    let status = body.status.trim().to_lowercase();
    if !business::is_valid_status(&status) {
        return Err(AppError::Validation(format!(
            "Unknown status '{}': expected 'active' or 'inactive'",
            body.status
        )));
    }

    let target = Business::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Business not found".to_string()))?;

    Business::set_status(&state.pool, target.id, &status).await?;

    tracing::info!(business_id = %target.id, status = %status, "Updated business status");

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Business status updated",
    })))
}

pub fn router() -> Router<AppState> {
    let admin_routes = Router::new()
        .route("/businesses/:id/place-search", post(place_search_business))
        .route("/businesses/place-search/batch", post(batch_place_search))
        .route("/businesses/:id/place", post(assign_place))
        .route("/businesses/:id/status", post(set_business_status))
        .route_layer(middleware::from_fn(require_admin));

    Router::new()
        .route("/businesses", get(search_businesses).post(create_business))
        .route("/businesses/:id", get(get_business))
        .merge(admin_routes)
}
