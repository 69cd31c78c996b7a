//! Authentication middleware
//!
//! Extracts and validates JWT tokens from requests.

use crate::auth::{decode_token, Role};
use crate::error::AppError;
use crate::state::SharedState;
use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

/// Require a valid admin token; the claims are attached to the request
pub async fn admin_middleware(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization format".to_string()))?;

    let claims = decode_token(token, &state.jwt_secret)?;
    if !claims.role.can_configure() {
        return Err(AppError::Forbidden(format!(
            "Requires {} role, you have {}",
            Role::Admin,
            claims.role
        )));
    }
    debug!("Admin request by {} ({})", claims.email, claims.sub);

    // Insert claims into request extensions for handlers to use
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}
