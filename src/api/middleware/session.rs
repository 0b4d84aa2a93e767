use axum::extract::FromRef;
use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

/// Session keys used in the application.
///
/// Both values are written by the external auth provider's integration
/// when a session is established; this service only reads them.
pub const SESSION_KEY_USER_ID: &str = "user_id";
pub const SESSION_KEY_IS_ADMIN: &str = "is_admin";

/// Creates a session layer for Axum
pub async fn create_session_layer(
    pool: PgPool,
    _session_secret: &[u8],
) -> Result<SessionManagerLayer<PostgresStore>, sqlx::Error> {
    // Create the session store backed by PostgreSQL
    let session_store = PostgresStore::new(pool);
    session_store.migrate().await?;

    // Build the session layer
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(true) // Only send over HTTPS in production
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(24)));

    Ok(session_layer)
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: crate::config::Config,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> PgPool {
        state.pool.clone()
    }
}
