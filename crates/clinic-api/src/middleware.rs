use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use tracing::warn;

use clinic_types::api::Claims;
use clinic_types::models::User;

use crate::error::ApiError;
use crate::state::{AppState, run_db};

/// Resolve the bearer token to a user and attach it to the request.
pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.map_err(|_| ApiError::Unauthenticated)?;

    let claims = decode_token(&state.jwt_secret, bearer.token()).map_err(|e| {
        warn!("Rejected bearer token: {}", e);
        ApiError::Unauthenticated
    })?;
    let user_id: i64 = claims.sub.parse().map_err(|_| ApiError::Unauthenticated)?;

    let user: User = run_db(&state, move |db| db.get_user_by_id(user_id))
        .await?
        .ok_or_else(|| {
            warn!("Bearer token for unknown user {}", user_id);
            ApiError::Unauthenticated
        })?
        .into();

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Tokens carry no expiry, so only the signature is checked.
pub fn decode_token(secret: &str, token: &str) -> jsonwebtoken::errors::Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.required_spec_claims.clear();
    validation.validate_exp = false;

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)?;
    Ok(data.claims)
}
