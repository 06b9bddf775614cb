use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

/// Rejects requests without `Authorization: Bearer <API_TOKEN>`. A no-op when
/// no token is configured.
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.api_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    if presented != Some(expected) {
        warn!(path = %request.uri().path(), "rejected request without valid token");
        return Err(AppError::Unauthorized("missing or invalid bearer token".to_string()));
    }

    Ok(next.run(request).await)
}
