use axum::{Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};

use crate::crypto::{hash_password, verify_password};
use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::models::{RegisterUser, User};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterUser>,
) -> Result<Json<AuthResponse>> {
    if input.full_name.trim().is_empty()
        || input.roll_number.trim().is_empty()
        || input.email.trim().is_empty()
        || input.password.is_empty()
    {
        return Err(AppError::BadRequest(
            "Full name, roll number, email and password are required".into(),
        ));
    }

    let conn = state.db.get()?;
    let password_hash = hash_password(&input.password);
    let user = queries::create_user(&conn, &input, &password_hash)?;
    let token = state.jwt.sign(&user.id)?;

    tracing::info!(user_id = %user.id, "user registered");

    Ok(Json(AuthResponse { token, user }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let conn = state.db.get()?;

    let user = queries::get_user_by_email(&conn, &input.email)?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".into()))?;

    if !user.is_active || !verify_password(&input.password, &user.password_hash) {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let token = state.jwt.sign(&user.id)?;

    Ok(Json(AuthResponse { token, user }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}
