use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json as SqlJson, FromRow, PgPool};
use uuid::Uuid;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_VERIFIED: &str = "verified";
pub const STATUS_DENIED: &str = "denied";

/// One uploaded document substantiating service status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    pub doc_type: String, // "dd214", "military_id", "badge", ...
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A user's request to be verified as veteran/active-duty/first-responder.
///
/// Lifecycle: pending -> verified | denied, exactly once. Terminal states
/// are immutable; there is no re-open transition.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VerificationRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_type: String, // "veteran", "active-duty", "first-responder", "spouse"
    pub branch: Option<String>,
    pub documents: SqlJson<Vec<DocumentDescriptor>>,
    pub status: String,
    pub reviewer_notes: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateVerificationData {
    pub user_id: Uuid,
    pub service_type: String,
    pub branch: Option<String>,
    pub documents: Vec<DocumentDescriptor>,
}

/// Reviewer action on a pending request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Approve,
    Deny,
}

impl ReviewAction {
    pub fn parse(action: &str) -> Option<Self> {
        match action.trim().to_lowercase().as_str() {
            "approve" => Some(Self::Approve),
            "deny" => Some(Self::Deny),
            _ => None,
        }
    }

    /// Status a request moves to when this action succeeds
    pub fn target_status(self) -> &'static str {
        match self {
            Self::Approve => STATUS_VERIFIED,
            Self::Deny => STATUS_DENIED,
        }
    }
}

/// Whether a status admits no further transitions
pub fn is_terminal(status: &str) -> bool {
    status == STATUS_VERIFIED || status == STATUS_DENIED
}

/// Outcome of attempting a review transition
#[derive(Debug)]
pub enum ReviewOutcome {
    /// Transitioned to the target status
    Updated(VerificationRequest),
    /// No request exists for that ID
    NotFound,
    /// Request already reached a terminal status
    AlreadyReviewed { status: String },
}

impl VerificationRequest {
    /// Creates a new pending verification request
    pub async fn create(
        pool: &PgPool,
        data: CreateVerificationData,
    ) -> Result<Self, sqlx::Error> {
        let request = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO verification_requests (user_id, service_type, branch, documents)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(data.user_id)
        .bind(&data.service_type)
        .bind(&data.branch)
        .bind(SqlJson(data.documents))
        .fetch_one(pool)
        .await?;

        Ok(request)
    }

    /// Finds a request by its internal ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let request = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM verification_requests WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(request)
    }

    /// Lists the pending review queue, oldest first
    pub async fn list_pending(pool: &PgPool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        let requests = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM verification_requests
            WHERE status = 'pending'
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(requests)
    }

    /// Applies a review transition.
    ///
    /// Status, notes, reviewer and timestamp change in one UPDATE guarded
    /// by `status = 'pending'`, so the mutation is all-or-nothing and a
    /// request that already reached a terminal state is left untouched.
    pub async fn review(
        pool: &PgPool,
        id: Uuid,
        action: ReviewAction,
        notes: Option<String>,
        reviewed_by: Uuid,
    ) -> Result<ReviewOutcome, sqlx::Error> {
        let updated = sqlx::query_as::<_, Self>(
            r#"
            UPDATE verification_requests
            SET status = $2, reviewer_notes = $3, reviewed_by = $4, reviewed_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(action.target_status())
        .bind(&notes)
        .bind(reviewed_by)
        .fetch_optional(pool)
        .await?;

        if updated.is_some() {
            return Ok(Self::resolve_outcome(updated, None));
        }

        // The guard didn't match: distinguish missing from already-terminal
        let existing = Self::find_by_id(pool, id).await?;
        Ok(Self::resolve_outcome(None, existing))
    }

    /// Decides the caller-visible outcome from the guarded UPDATE result
    /// and, when the guard missed, the request's current row.
    fn resolve_outcome(updated: Option<Self>, existing: Option<Self>) -> ReviewOutcome {
        match (updated, existing) {
            (Some(request), _) => ReviewOutcome::Updated(request),
            (None, Some(existing)) => ReviewOutcome::AlreadyReviewed {
                status: existing.status,
            },
            (None, None) => ReviewOutcome::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn request_with_status(status: &str) -> VerificationRequest {
        VerificationRequest {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            service_type: "veteran".to_string(),
            branch: Some("Army".to_string()),
            documents: SqlJson(Vec::new()),
            status: status.to_string(),
            reviewer_notes: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_parse_review_action() {
        assert_eq!(ReviewAction::parse("approve"), Some(ReviewAction::Approve));
        assert_eq!(ReviewAction::parse(" DENY "), Some(ReviewAction::Deny));
        assert_eq!(ReviewAction::parse("reopen"), None);
    }

    #[test]
    fn test_action_target_status() {
        assert_eq!(ReviewAction::Approve.target_status(), STATUS_VERIFIED);
        assert_eq!(ReviewAction::Deny.target_status(), STATUS_DENIED);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!is_terminal(STATUS_PENDING));
        assert!(is_terminal(STATUS_VERIFIED));
        assert!(is_terminal(STATUS_DENIED));
    }

    #[test]
    fn test_denied_request_rejects_second_approval() {
        // The UPDATE guard only matches pending rows, so a second call
        // against a denied request produces no updated row and the
        // request stays denied instead of flipping to verified.
        let denied = request_with_status(STATUS_DENIED);

        let outcome = VerificationRequest::resolve_outcome(None, Some(denied));

        match outcome {
            ReviewOutcome::AlreadyReviewed { status } => assert_eq!(status, STATUS_DENIED),
            other => panic!("expected AlreadyReviewed, got {:?}", other),
        }
    }

    #[test]
    fn test_pending_transition_resolves_to_updated() {
        let verified = request_with_status(STATUS_VERIFIED);

        let outcome = VerificationRequest::resolve_outcome(Some(verified), None);

        match outcome {
            ReviewOutcome::Updated(request) => assert_eq!(request.status, STATUS_VERIFIED),
            other => panic!("expected Updated, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_request_resolves_to_not_found() {
        let outcome = VerificationRequest::resolve_outcome(None, None);

        assert!(matches!(outcome, ReviewOutcome::NotFound));
    }
}
