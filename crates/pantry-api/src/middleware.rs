use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{DecodingKey, Validation, decode};

use pantry_types::api::{Claims, TokenPurpose};

use crate::AppState;
use crate::error::ApiError;

/// Extract and validate the bearer token. Only session tokens pass; a
/// password-reset token is rejected here no matter which route it hits.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthenticated)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthenticated)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::InvalidCredential)?;

    if token_data.claims.purpose != TokenPurpose::Session {
        return Err(ApiError::InvalidCredential);
    }

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}
