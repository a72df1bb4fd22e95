use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use jsonwebtoken::{DecodingKey, Validation, decode};

use guestbook_types::api::Claims;

use crate::AppState;
use crate::error::ApiError;

/// Extract and validate the admin JWT from the Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(ApiError::Unauthorized)?;

    let token_data = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized)?;

    // A token minted for a previous admin address stops working once the
    // configured address changes.
    if state.admin_address != Some(token_data.claims.sub) {
        return Err(ApiError::Unauthorized);
    }

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}
