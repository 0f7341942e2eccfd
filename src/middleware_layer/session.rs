use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, state::AppState};

/// Header carrying the opaque session token.
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// A middleware that requires a valid session token to be present.
///
/// The resolved session is placed in the request extensions for handlers
/// to pick up; validation also evicts the session if it turns out to be
/// expired, so the same token fails as unknown on the next request.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    tracing::debug!("🔐 Checking session token...");

    let token = request
        .headers()
        .get(SESSION_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::SessionNotFound)?;

    let session = state.sessions.validate(token)?;

    tracing::debug!("✅ Session resolved for staff: {}", session.staff_id);

    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}
