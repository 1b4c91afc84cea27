//! Shared-token authentication for the webhook route
//!
//! The event platform sends the configured token verbatim in the
//! `Authorization` header. There is no scheme prefix and no signature.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{ApiError, AppState};

/// Authentication middleware
///
/// Returns 401 unless the `Authorization` header equals the configured token.
/// Applied to protected routes only; `/health` does not use it.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

    match provided {
        Some(token) if token == state.auth_token => Ok(next.run(request).await),
        Some(token) => {
            warn!("Incorrect auth: {:?}", token);
            Err(ApiError::Unauthorized(token))
        }
        None => {
            warn!("Missing Authorization header");
            Err(ApiError::Unauthorized("missing header".to_string()))
        }
    }
}
