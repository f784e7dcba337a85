use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use pinboard_core::gate::hash_password;
use pinboard_types::api::{
    ApiResponse, Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse,
};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(ApiError::bad_request("username must be 3-32 characters"));
    }
    if req.password.len() < 8 {
        return Err(ApiError::bad_request("password must be at least 8 characters"));
    }

    let username = req.username.clone();
    let taken = state
        .blocking(move |db| Ok(db.get_profile_by_username(&username)?.is_some()))
        .await?;
    if taken {
        return Err(ApiError::new(StatusCode::CONFLICT, "username is taken"));
    }

    let password_hash = hash_password(&req.password).map_err(ApiError::internal)?;

    let profile_id = Uuid::new_v4();
    let username = req.username.clone();
    state
        .blocking(move |db| {
            db.create_profile(
                profile_id,
                &username,
                &password_hash,
                &req.first_name,
                &req.last_name,
            )
        })
        .await?;

    let token = create_token(&state.jwt_secret, profile_id, &req.username)
        .map_err(ApiError::internal)?;
    info!("Registered profile {} ({})", req.username, profile_id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(RegisterResponse { profile_id, token })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.clone();
    let profile = state
        .blocking(move |db| db.get_profile_by_username(&username))
        .await?
        .ok_or_else(ApiError::unauthorized)?;

    let parsed_hash = PasswordHash::new(&profile.password)
        .map_err(|e| ApiError::internal(anyhow::anyhow!("stored hash unreadable: {}", e)))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::unauthorized())?;

    let profile_id: Uuid = profile
        .id
        .parse()
        .map_err(|e| ApiError::internal(anyhow::anyhow!("bad profile id: {}", e)))?;
    let token = create_token(&state.jwt_secret, profile_id, &profile.username)
        .map_err(ApiError::internal)?;

    Ok(Json(ApiResponse::ok(LoginResponse {
        profile_id,
        username: profile.username,
        token,
    })))
}

pub fn create_token(secret: &str, profile_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: profile_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
