use axum::{
    Router,
    extract::{Extension, State},
    middleware,
    routing::{get, post, put},
};
use rusqlite::Connection;

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::matching;
use crate::middleware::{AuthUser, optional_auth, require_auth};
use crate::models::{
    CreateProject, JoinRequest, JoinRequestDecision, Project, ProjectCard, ProjectView,
    ProjectWithRoles, RespondToJoinRequest, SubmitJoinRequest, has_open_role,
};

fn card(conn: &Connection, project: Project) -> Result<ProjectCard> {
    let required_roles = queries::list_project_roles(conn, &project.id)?;
    let owner = queries::get_user_brief(conn, &project.owner_id)?
        .ok_or_else(|| AppError::Internal(format!("owner missing for project {}", project.id)))?;
    Ok(ProjectCard {
        id: project.id,
        title: project.title,
        description: project.description,
        project_status: project.project_status,
        required_roles,
        owner,
        created_at: project.created_at,
    })
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(input): Json<CreateProject>,
) -> Result<Json<ProjectWithRoles>> {
    let mut conn = state.db.get()?;
    let created = queries::create_project(&mut conn, &user.id, &input)?;

    tracing::info!(
        project_id = %created.project.id,
        owner_id = %user.id,
        roles = created.required_roles.len(),
        "project created"
    );

    Ok(Json(created))
}

/// Open, visible projects that still have at least one open role,
/// newest first.
pub async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<ProjectCard>>> {
    let conn = state.db.get()?;

    let mut cards = Vec::new();
    for project in queries::list_open_projects(&conn)? {
        let roles = queries::list_project_roles(&conn, &project.id)?;
        if !has_open_role(&roles) {
            continue;
        }
        cards.push(card(&conn, project)?);
    }

    Ok(Json(cards))
}

/// Projects whose required skills overlap the user's known skills.
/// Scan order (creation order) is preserved; no relevance ranking.
pub async fn match_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<ProjectCard>>> {
    let conn = state.db.get()?;

    let user = queries::get_user_by_id(&conn, &user_id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    let known = matching::known_skill_names(&user.skills_known);

    let mut cards = Vec::new();
    for project in queries::list_match_candidates(&conn)? {
        let roles = queries::list_project_roles(&conn, &project.id)?;
        if !matching::is_candidate(&roles, &known) {
            continue;
        }
        cards.push(card(&conn, project)?);
    }

    Ok(Json(cards))
}

/// Full project view. Contact fields of the owner and members are
/// redacted unless the viewer is the owner or a member; the stored rows
/// are never modified.
pub async fn get_project(
    State(state): State<AppState>,
    viewer: Option<Extension<AuthUser>>,
    Path(id): Path<String>,
) -> Result<Json<ProjectView>> {
    let conn = state.db.get()?;

    let project = queries::get_project_by_id(&conn, &id)?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))?;

    let roles = queries::list_project_roles(&conn, &id)?;
    let members = queries::list_member_profiles(&conn, &id)?;
    let join_requests = queries::list_join_requests(&conn, &id)?;
    let owner = queries::get_user_by_id(&conn, &project.owner_id)?
        .ok_or_else(|| AppError::Internal(format!("owner missing for project {id}")))?
        .profile();

    let viewer_id = viewer.as_ref().map(|Extension(AuthUser(u))| u.id.as_str());

    Ok(Json(ProjectView::assemble(
        project,
        roles,
        owner,
        members,
        join_requests,
        viewer_id,
    )))
}

pub async fn join_project(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(input): Json<SubmitJoinRequest>,
) -> Result<Json<JoinRequest>> {
    let mut conn = state.db.get()?;
    let request = queries::submit_join_request(&mut conn, &id, &user.id, &input.role_name)?;

    tracing::info!(
        project_id = %id,
        user_id = %user.id,
        role = %request.role_name,
        "join request submitted"
    );

    Ok(Json(request))
}

pub async fn respond_to_join_request(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(input): Json<RespondToJoinRequest>,
) -> Result<Json<JoinRequestDecision>> {
    let mut conn = state.db.get()?;
    let decision =
        queries::respond_join_request(&mut conn, &id, &input.request_id, &user.id, input.action)?;

    tracing::info!(
        project_id = %id,
        request_id = %input.request_id,
        action = input.action.as_ref(),
        status = decision.project_status.as_ref(),
        "join request resolved"
    );

    Ok(Json(decision))
}

pub async fn complete_project(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Project>> {
    let conn = state.db.get()?;
    let project = queries::complete_project(&conn, &id, &user.id)?;
    tracing::info!(project_id = %id, "project completed");
    Ok(Json(project))
}

pub async fn archive_project(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Project>> {
    let conn = state.db.get()?;
    let project = queries::archive_project(&conn, &id, &user.id)?;
    tracing::info!(project_id = %id, "project archived");
    Ok(Json(project))
}

pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/projects", get(list_projects))
        .route("/projects/match/{user_id}", get(match_for_user));

    let viewer = Router::new()
        .route("/projects/{id}", get(get_project))
        .layer(middleware::from_fn_with_state(state.clone(), optional_auth));

    let authed = Router::new()
        .route("/projects", post(create_project))
        .route("/projects/{id}/join", post(join_project))
        .route("/projects/{id}/respond", put(respond_to_join_request))
        .route("/projects/{id}/complete", put(complete_project))
        .route("/projects/{id}/archive", put(archive_project))
        .layer(middleware::from_fn_with_state(state, require_auth));

    public.merge(viewer).merge(authed)
}
