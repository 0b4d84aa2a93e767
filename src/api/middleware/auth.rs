use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use uuid::Uuid;

use super::session::{SESSION_KEY_IS_ADMIN, SESSION_KEY_USER_ID};

/// Authentication error responses
#[derive(Debug)]
pub enum AuthError {
    Unauthorized,
    AdminRequired,
    SessionError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required. Please log in.",
            )
                .into_response(),
            AuthError::AdminRequired => (
                StatusCode::FORBIDDEN,
                "Access denied. Administrator capability required.",
            )
                .into_response(),
            AuthError::SessionError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Session error occurred.").into_response()
            }
        }
    }
}

/// Middleware that requires the user to be authenticated
pub async fn require_auth(
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user_id: Option<Uuid> = session
        .get(SESSION_KEY_USER_ID)
        .await
        .map_err(|_| AuthError::SessionError)?;

    if user_id.is_none() {
        return Err(AuthError::Unauthorized);
    }

    Ok(next.run(request).await)
}

/// Middleware that requires the administrator capability flag.
///
/// The flag itself is granted by the external auth provider; admin-only
/// operations refuse to proceed without it, before any state mutation.
pub async fn require_admin(
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = get_authenticated_user(&session).await?;

    if !user.is_admin {
        return Err(AuthError::AdminRequired);
    }

    Ok(next.run(request).await)
}

/// The current principal, as established by the external auth provider
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub is_admin: bool,
}

/// Extracts the authenticated principal from the session
pub async fn get_authenticated_user(session: &Session) -> Result<AuthenticatedUser, AuthError> {
    let user_id: Uuid = session
        .get(SESSION_KEY_USER_ID)
        .await
        .map_err(|_| AuthError::SessionError)?
        .ok_or(AuthError::Unauthorized)?;

    let is_admin: bool = session
        .get(SESSION_KEY_IS_ADMIN)
        .await
        .map_err(|_| AuthError::SessionError)?
        .unwrap_or(false);

    Ok(AuthenticatedUser { user_id, is_admin })
}
