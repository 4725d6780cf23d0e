use axum::{
    Router,
    extract::{Extension, State},
    middleware,
    routing::{get, post, put},
};

use crate::db::{AppState, queries};
use crate::error::Result;
use crate::extractors::{Json, Path};
use crate::middleware::{AuthUser, require_auth};
use crate::models::{CreateExchange, Exchange, RespondToExchange};

pub async fn create_exchange(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(input): Json<CreateExchange>,
) -> Result<Json<Exchange>> {
    let conn = state.db.get()?;
    let exchange = queries::create_exchange(&conn, &user.id, &input)?;

    tracing::info!(
        exchange_id = %exchange.id,
        requester_id = %user.id,
        target_id = %exchange.target_id,
        "exchange request created"
    );

    Ok(Json(exchange))
}

/// Pending, visible exchange requests anyone can browse.
pub async fn browse_exchanges(State(state): State<AppState>) -> Result<Json<Vec<Exchange>>> {
    let conn = state.db.get()?;
    Ok(Json(queries::browse_exchanges(&conn)?))
}

pub async fn list_user_exchanges(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Exchange>>> {
    let conn = state.db.get()?;
    Ok(Json(queries::list_exchanges_for_user(&conn, &user_id)?))
}

pub async fn respond_to_exchange(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(input): Json<RespondToExchange>,
) -> Result<Json<Exchange>> {
    let conn = state.db.get()?;
    let exchange = queries::respond_exchange(&conn, &id, &user.id, input.action)?;
    Ok(Json(exchange))
}

pub async fn complete_exchange(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Exchange>> {
    let conn = state.db.get()?;
    let exchange = queries::complete_exchange(&conn, &id, &user.id)?;
    Ok(Json(exchange))
}

pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/exchanges", get(browse_exchanges));

    let authed = Router::new()
        .route("/exchanges", post(create_exchange))
        .route("/exchanges/user/{user_id}", get(list_user_exchanges))
        .route("/exchanges/{id}/respond", put(respond_to_exchange))
        .route("/exchanges/{id}/complete", put(complete_exchange))
        .layer(middleware::from_fn_with_state(state, require_auth));

    public.merge(authed)
}
