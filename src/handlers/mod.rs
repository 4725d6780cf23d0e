pub mod auth;
pub mod dev;
pub mod exchanges;
pub mod projects;
pub mod users;

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::db::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .merge(auth::router())
        .merge(users::router(state.clone()))
        .merge(projects::router(state.clone()))
        .merge(exchanges::router(state.clone()));

    if state.dev_mode {
        tracing::warn!("dev mode: mounting /dev routes");
        app = app.merge(dev::router());
    }

    app.with_state(state)
}
