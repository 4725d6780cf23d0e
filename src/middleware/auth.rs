use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

use crate::db::{AppState, queries};
use crate::models::User;
use crate::util::extract_bearer_token;

/// The authenticated caller, inserted into request extensions.
#[derive(Clone)]
pub struct AuthUser(pub User);

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_bearer_token(request.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    let claims = state
        .jwt
        .verify(token)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let conn = state.db.get().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let user = queries::get_user_by_id(&conn, &claims.user_id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !user.is_active {
        return Err(StatusCode::UNAUTHORIZED);
    }

    request.extensions_mut().insert(AuthUser(user));
    Ok(next.run(request).await)
}

/// Attach an identity when a valid token is present; anonymous or
/// unverifiable requests proceed with no identity and are treated as
/// non-participants downstream.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let user = extract_bearer_token(request.headers())
        .and_then(|token| state.jwt.verify(token).ok())
        .and_then(|claims| {
            let conn = state.db.get().ok()?;
            queries::get_user_by_id(&conn, &claims.user_id).ok().flatten()
        })
        .filter(|user: &User| user.is_active);

    if let Some(user) = user {
        request.extensions_mut().insert(AuthUser(user));
    }

    next.run(request).await
}
