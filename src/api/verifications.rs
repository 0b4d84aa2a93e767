use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::api::middleware::auth::{get_authenticated_user, require_admin};
use crate::api::middleware::session::AppState;
use crate::error::{AppError, Result};
use crate::models::verification_request::{
    CreateVerificationData, DocumentDescriptor, ReviewAction, ReviewOutcome, VerificationRequest,
};

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct SubmitVerificationRequest {
    pub service_type: String,
    pub branch: Option<String>,
    pub documents: Vec<SubmittedDocument>,
}

#[derive(Debug, Deserialize)]
pub struct SubmittedDocument {
    pub doc_type: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct PendingQueueResponse {
    pub requests: Vec<VerificationRequest>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct QueueParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub action: String, // "approve" or "deny"
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub success: bool,
    pub status: String,
    pub message: String,
}

// Handlers

/// Submit documents substantiating service status; opens a pending
/// verification request.
async fn submit_verification(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<SubmitVerificationRequest>,
) -> Result<(StatusCode, Json<VerificationRequest>)> {
    let user = get_authenticated_user(&session)
        .await
        .map_err(|_| AppError::Unauthorized)?;

    if body.service_type.trim().is_empty() {
        return Err(AppError::Validation("Service type is required".to_string()));
    }
    if body.documents.is_empty() {
        return Err(AppError::Validation(
            "At least one document is required".to_string(),
        ));
    }

    let documents = body
        .documents
        .into_iter()
        .map(|doc| DocumentDescriptor {
            doc_type: doc.doc_type,
            url: doc.url,
            uploaded_at: chrono::Utc::now(),
        })
        .collect();

    let request = VerificationRequest::create(
        &state.pool,
        CreateVerificationData {
            user_id: user.user_id,
            service_type: body.service_type.trim().to_string(),
            branch: body.branch.filter(|s| !s.trim().is_empty()),
            documents,
        },
    )
    .await?;

    tracing::info!(
        request_id = %request.id,
        user_id = %user.user_id,
        "Verification request submitted"
    );

    Ok((StatusCode::CREATED, Json(request)))
}

/// Pending review queue, oldest first. An empty queue is a positive
/// state, not an error.
async fn pending_queue(
    State(state): State<AppState>,
    Query(params): Query<QueueParams>,
) -> Result<Json<PendingQueueResponse>> {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let requests = VerificationRequest::list_pending(&state.pool, limit).await?;

    let message = if requests.is_empty() {
        "All caught up - no pending verifications".to_string()
    } else {
        format!("{} verification(s) awaiting review", requests.len())
    };

    Ok(Json(PendingQueueResponse { requests, message }))
}

/// Apply a review decision to a pending request.
///
/// A request that already reached verified/denied is rejected with 409
/// rather than silently overwritten; there is no re-open transition.
async fn review_verification(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<ReviewRequest>,
) -> Result<Json<ReviewResponse>> {
    let reviewer = get_authenticated_user(&session)
        .await
        .map_err(|_| AppError::Unauthorized)?;

    let action = ReviewAction::parse(&body.action).ok_or_else(|| {
        AppError::Validation(format!(
            "Unknown review action '{}': expected 'approve' or 'deny'",
            body.action
        ))
    })?;

    let notes = body.notes.filter(|s| !s.trim().is_empty());

    let outcome =
        VerificationRequest::review(&state.pool, id, action, notes, reviewer.user_id).await?;
    let response = outcome_to_response(outcome)?;

    tracing::info!(
        request_id = %id,
        reviewer_id = %reviewer.user_id,
        status = %response.status,
        "Verification request reviewed"
    );

    Ok(Json(response))
}

/// Maps a review outcome to the caller-visible response: terminal
/// requests are rejected with a conflict, never silently overwritten.
fn outcome_to_response(outcome: ReviewOutcome) -> Result<ReviewResponse> {
    match outcome {
        ReviewOutcome::Updated(request) => Ok(ReviewResponse {
            success: true,
            status: request.status.clone(),
            message: format!("Request {}", request.status),
        }),
        ReviewOutcome::NotFound => Err(AppError::NotFound(
            "Verification request not found".to_string(),
        )),
        ReviewOutcome::AlreadyReviewed { status } => Err(AppError::Conflict(format!(
            "Request was already reviewed (status: {})",
            status
        ))),
    }
}

pub fn router() -> Router<AppState> {
    let admin_routes = Router::new()
        .route("/admin/verifications", get(pending_queue))
        .route("/admin/verifications/:id/review", post(review_verification))
        .route_layer(middleware::from_fn(require_admin));

    Router::new()
        .route("/verifications", post(submit_verification))
        .merge(admin_routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use sqlx::types::Json as SqlJson;
    use crate::models::verification_request::{STATUS_DENIED, STATUS_VERIFIED};

    fn verified_request() -> VerificationRequest {
        VerificationRequest {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            service_type: "veteran".to_string(),
            branch: None,
            documents: SqlJson(Vec::new()),
            status: STATUS_VERIFIED.to_string(),
            reviewer_notes: Some("DD-214 checks out".to_string()),
            reviewed_by: Some(Uuid::new_v4()),
            reviewed_at: Some(chrono::Utc::now()),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_updated_outcome_reports_success() {
        let response = outcome_to_response(ReviewOutcome::Updated(verified_request())).unwrap();

        assert!(response.success);
        assert_eq!(response.status, STATUS_VERIFIED);
    }

    #[test]
    fn test_already_reviewed_maps_to_conflict() {
        // A denied request hit by a second approval call comes back as
        // AlreadyReviewed and must surface as 409, not a silent success.
        let err = outcome_to_response(ReviewOutcome::AlreadyReviewed {
            status: STATUS_DENIED.to_string(),
        })
        .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_missing_request_maps_to_not_found() {
        let err = outcome_to_response(ReviewOutcome::NotFound).unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
