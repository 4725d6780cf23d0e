use axum::{
    Router,
    extract::{Extension, State},
    middleware,
    routing::{get, put},
};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::middleware::{AuthUser, require_auth};
use crate::models::{UpdateUser, User};

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>> {
    let conn = state.db.get()?;
    let user = queries::get_user_by_id(&conn, &id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Json(user))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(AuthUser(actor)): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(input): Json<UpdateUser>,
) -> Result<Json<User>> {
    if actor.id != id {
        return Err(AppError::Forbidden("You can only update your own profile".into()));
    }

    let conn = state.db.get()?;
    queries::update_user(&conn, &id, &input)?;

    let user = queries::get_user_by_id(&conn, &id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Json(user))
}

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users/{id}", get(get_user))
        .route("/users/{id}", put(update_user))
        .layer(middleware::from_fn_with_state(state, require_auth))
}
