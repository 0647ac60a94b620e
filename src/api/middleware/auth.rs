use crate::AppState;
use crate::utils::auth::validate_jwt;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

/// Requires `Authorization: Bearer <jwt>` and exposes the claims to handlers
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string());

    if let Some(token) = token {
        match validate_jwt(&token, &state.config.jwt_secret) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                return Ok(next.run(req).await);
            }
            Err(e) => tracing::debug!("Rejected bearer token: {}", e),
        }
    }

    Err(StatusCode::UNAUTHORIZED)
}
