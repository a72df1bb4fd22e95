use axum::{Json, extract::State};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};

use guestbook_crypto::{parse_signature, recover_personal};
use guestbook_types::Address;
use guestbook_types::api::{Claims, LoginRequest, LoginResponse};

use crate::AppState;
use crate::error::ApiError;

/// The fixed text the admin wallet signs with `personal_sign` to log in.
pub const ADMIN_LOGIN_MESSAGE: &str = "Login to Portfolio Admin Panel";

const TOKEN_LIFETIME_HOURS: i64 = 1;

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let admin = state.admin_address.ok_or(ApiError::Unauthorized)?;

    let signature =
        parse_signature(&req.signature).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let recovered = recover_personal(ADMIN_LOGIN_MESSAGE.as_bytes(), &signature)
        .map_err(|_| ApiError::Unauthorized)?;

    if recovered != req.address || recovered != admin {
        warn!("Rejected admin login from {}", recovered);
        return Err(ApiError::Unauthorized);
    }

    let token = create_token(&state.jwt_secret, admin)?;
    info!("Admin {} logged in", admin.short());
    Ok(Json(LoginResponse { token }))
}

fn create_token(secret: &str, admin: Address) -> anyhow::Result<String> {
    let claims = Claims {
        sub: admin,
        role: "admin".into(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
