use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{Connection, TransactionBehavior, params};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::*;
use crate::util::normalize_email;

use super::from_row::{
    EXCHANGE_COLS, JOIN_REQUEST_COLS, MEMBER_COLS, PROJECT_COLS, ROLE_COLS, USER_COLS, query_all,
    query_one,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| AppError::Internal(format!("json encode: {e}")))
}

/// Builder for dynamic UPDATE statements with optional fields.
/// Combines multiple field updates into a single query.
struct UpdateBuilder {
    table: &'static str,
    id: String,
    fields: Vec<(&'static str, Value)>,
    track_updated_at: bool,
}

impl UpdateBuilder {
    fn new(table: &'static str, id: &str) -> Self {
        Self {
            table,
            id: id.to_string(),
            fields: Vec::new(),
            track_updated_at: false,
        }
    }

    fn with_updated_at(mut self) -> Self {
        self.track_updated_at = true;
        self
    }

    fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.fields.push((column, value.into()));
        self
    }

    fn set_opt<V: Into<Value>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    fn execute(mut self, conn: &Connection) -> Result<bool> {
        if self.fields.is_empty() {
            return Ok(false);
        }
        if self.track_updated_at {
            self.fields.push(("updated_at", now().into()));
        }
        let sets: Vec<String> = self
            .fields
            .iter()
            .map(|(col, _)| format!("{} = ?", col))
            .collect();
        let mut values: Vec<Value> = self.fields.into_iter().map(|(_, v)| v).collect();
        values.push(self.id.into());
        let sql = format!("UPDATE {} SET {} WHERE id = ?", self.table, sets.join(", "));
        let affected = conn.execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(affected > 0)
    }
}

// ============ Users ============

pub fn create_user(conn: &Connection, input: &RegisterUser, password_hash: &str) -> Result<User> {
    let id = gen_id();
    let now = now();
    let email = normalize_email(&input.email);

    conn.execute(
        "INSERT INTO users (id, full_name, roll_number, email, phone_number, password_hash,
                            department, year, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            &id,
            &input.full_name,
            &input.roll_number,
            &email,
            &input.phone_number,
            password_hash,
            &input.department,
            &input.year,
            now,
            now
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Duplicate("Roll number or email already registered".into())
        } else {
            e.into()
        }
    })?;

    Ok(User {
        id,
        full_name: input.full_name.clone(),
        roll_number: input.roll_number.clone(),
        email,
        phone_number: input.phone_number.clone(),
        password_hash: password_hash.to_string(),
        department: input.department.clone(),
        year: input.year.clone(),
        bio: None,
        github: None,
        linkedin: None,
        profile_image: None,
        skills_known: Vec::new(),
        skills_wanted: Vec::new(),
        interests: Vec::new(),
        rating: 0.0,
        total_ratings: 0,
        is_active: true,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLS),
        params![id],
    )
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE email = ?1", USER_COLS),
        params![normalize_email(email)],
    )
}

pub fn get_user_brief(conn: &Connection, id: &str) -> Result<Option<UserBrief>> {
    let mut stmt = conn.prepare("SELECT id, full_name, profile_image FROM users WHERE id = ?1")?;
    let mut rows = stmt.query_map(params![id], |row| {
        Ok(UserBrief {
            id: row.get(0)?,
            full_name: row.get(1)?,
            profile_image: row.get(2)?,
        })
    })?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn update_user(conn: &Connection, id: &str, input: &UpdateUser) -> Result<bool> {
    let skills_known = input.skills_known.as_ref().map(to_json).transpose()?;
    let skills_wanted = input.skills_wanted.as_ref().map(to_json).transpose()?;
    let interests = input.interests.as_ref().map(to_json).transpose()?;

    UpdateBuilder::new("users", id)
        .with_updated_at()
        .set_opt("full_name", input.full_name.clone())
        .set_opt("phone_number", input.phone_number.clone())
        .set_opt("department", input.department.clone())
        .set_opt("year", input.year.clone())
        .set_opt("bio", input.bio.clone())
        .set_opt("github", input.github.clone())
        .set_opt("linkedin", input.linkedin.clone())
        .set_opt("profile_image", input.profile_image.clone())
        .set_opt("skills_known", skills_known)
        .set_opt("skills_wanted", skills_wanted)
        .set_opt("interests", interests)
        .execute(conn)
}

// ============ Projects ============

pub fn create_project(
    conn: &mut Connection,
    owner_id: &str,
    input: &CreateProject,
) -> Result<ProjectWithRoles> {
    if input.title.trim().is_empty() || input.description.trim().is_empty() {
        return Err(AppError::BadRequest("Title and description are required".into()));
    }
    if input.required_roles.is_empty() {
        return Err(AppError::BadRequest("At least one role is required".into()));
    }

    let mut seen = std::collections::HashSet::new();
    for role in &input.required_roles {
        if role.role_name.trim().is_empty() {
            return Err(AppError::BadRequest("Role name is required".into()));
        }
        if role.number_of_openings < 1 {
            return Err(AppError::BadRequest(
                "Each role needs at least one opening".into(),
            ));
        }
        if !seen.insert(role.role_name.as_str()) {
            return Err(AppError::Duplicate(format!(
                "Duplicate role name '{}'",
                role.role_name
            )));
        }
    }

    let id = gen_id();
    let now = now();
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO projects (id, title, description, owner_id, project_status, is_visible,
                               created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7)",
        params![
            &id,
            &input.title,
            &input.description,
            owner_id,
            ProjectStatus::Open.as_ref(),
            now,
            now
        ],
    )?;

    let mut roles = Vec::with_capacity(input.required_roles.len());
    for (position, role) in input.required_roles.iter().enumerate() {
        tx.execute(
            "INSERT INTO project_roles (project_id, role_name, required_skills,
                                        number_of_openings, filled_positions, position)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            params![
                &id,
                &role.role_name,
                to_json(&role.required_skills)?,
                role.number_of_openings,
                position as i64
            ],
        )?;
        roles.push(RoleSlot {
            role_name: role.role_name.clone(),
            required_skills: role.required_skills.clone(),
            number_of_openings: role.number_of_openings,
            filled_positions: 0,
        });
    }

    tx.commit()?;

    Ok(ProjectWithRoles {
        project: Project {
            id,
            title: input.title.clone(),
            description: input.description.clone(),
            owner_id: owner_id.to_string(),
            project_status: ProjectStatus::Open,
            is_visible: true,
            created_at: now,
            updated_at: now,
        },
        required_roles: roles,
    })
}

pub fn get_project_by_id(conn: &Connection, id: &str) -> Result<Option<Project>> {
    query_one(
        conn,
        &format!("SELECT {} FROM projects WHERE id = ?1", PROJECT_COLS),
        params![id],
    )
}

pub fn list_project_roles(conn: &Connection, project_id: &str) -> Result<Vec<RoleSlot>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM project_roles WHERE project_id = ?1 ORDER BY position",
            ROLE_COLS
        ),
        params![project_id],
    )
}

pub fn list_project_members(conn: &Connection, project_id: &str) -> Result<Vec<ProjectMember>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM project_members WHERE project_id = ?1 ORDER BY created_at",
            MEMBER_COLS
        ),
        params![project_id],
    )
}

pub fn list_join_requests(conn: &Connection, project_id: &str) -> Result<Vec<JoinRequest>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM join_requests WHERE project_id = ?1 ORDER BY created_at",
            JOIN_REQUEST_COLS
        ),
        params![project_id],
    )
}

/// Members joined with their user profiles, for the project detail view.
pub fn list_member_profiles(
    conn: &Connection,
    project_id: &str,
) -> Result<Vec<(ProjectMember, UserProfile)>> {
    let mut stmt = conn.prepare(
        "SELECT m.user_id, m.role_name, m.created_at,
                u.full_name, u.email, u.phone_number, u.profile_image
         FROM project_members m
         JOIN users u ON u.id = m.user_id
         WHERE m.project_id = ?1
         ORDER BY m.created_at",
    )?;
    let rows = stmt.query_map(params![project_id], |row| {
        let member = ProjectMember {
            user_id: row.get(0)?,
            role_name: row.get(1)?,
            created_at: row.get(2)?,
        };
        let profile = UserProfile {
            id: member.user_id.clone(),
            full_name: row.get(3)?,
            email: Some(row.get(4)?),
            phone_number: row.get(5)?,
            profile_image: row.get(6)?,
        };
        Ok((member, profile))
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

/// Open, visible projects, newest first. Used by the public listing,
/// which additionally drops projects with no open role left.
pub fn list_open_projects(conn: &Connection) -> Result<Vec<Project>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM projects
             WHERE project_status = ?1 AND is_visible = 1
             ORDER BY created_at DESC",
            PROJECT_COLS
        ),
        params![ProjectStatus::Open.as_ref()],
    )
}

/// Open, visible projects in insertion order. The matching scan preserves
/// creation order rather than ranking results.
pub fn list_match_candidates(conn: &Connection) -> Result<Vec<Project>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM projects
             WHERE project_status = ?1 AND is_visible = 1
             ORDER BY created_at ASC",
            PROJECT_COLS
        ),
        params![ProjectStatus::Open.as_ref()],
    )
}

/// Append a pending join request after validating eligibility.
///
/// Runs as an IMMEDIATE transaction so the eligibility snapshot (project
/// open, role not full, no duplicate request, no existing membership)
/// cannot be invalidated by a concurrent writer between check and insert.
pub fn submit_join_request(
    conn: &mut Connection,
    project_id: &str,
    user_id: &str,
    role_name: &str,
) -> Result<JoinRequest> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let project: Project = query_one(
        &tx,
        &format!("SELECT {} FROM projects WHERE id = ?1", PROJECT_COLS),
        params![project_id],
    )?
    .ok_or_else(|| AppError::NotFound("Project not found".into()))?;

    if !project.is_visible || project.project_status != ProjectStatus::Open {
        return Err(AppError::InvalidState("Project is not open for joining".into()));
    }
    if project.owner_id == user_id {
        return Err(AppError::Duplicate("Owner cannot apply to own project".into()));
    }

    let role: RoleSlot = query_one(
        &tx,
        &format!(
            "SELECT {} FROM project_roles WHERE project_id = ?1 AND role_name = ?2",
            ROLE_COLS
        ),
        params![project_id, role_name],
    )?
    .ok_or_else(|| AppError::BadRequest("Role not found".into()))?;

    if !role.is_open() {
        return Err(AppError::CapacityConflict("Role already filled".into()));
    }

    // A rejected request may be retried; anything else for the same
    // (user, role) pair blocks a new application.
    let duplicates: i64 = tx.query_row(
        "SELECT COUNT(*) FROM join_requests
         WHERE project_id = ?1 AND user_id = ?2 AND role_name = ?3 AND status != ?4",
        params![
            project_id,
            user_id,
            role_name,
            JoinRequestStatus::Rejected.as_ref()
        ],
        |row| row.get(0),
    )?;
    if duplicates > 0 {
        return Err(AppError::Duplicate("Duplicate join request".into()));
    }

    let memberships: i64 = tx.query_row(
        "SELECT COUNT(*) FROM project_members WHERE project_id = ?1 AND user_id = ?2",
        params![project_id, user_id],
        |row| row.get(0),
    )?;
    if memberships > 0 {
        return Err(AppError::Duplicate("Already a member of this project".into()));
    }

    let id = gen_id();
    let created_at = now();
    tx.execute(
        "INSERT INTO join_requests (id, project_id, user_id, role_name, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            &id,
            project_id,
            user_id,
            role_name,
            JoinRequestStatus::Pending.as_ref(),
            created_at
        ],
    )?;
    tx.commit()?;

    Ok(JoinRequest {
        id,
        project_id: project_id.to_string(),
        user_id: user_id.to_string(),
        role_name: role_name.to_string(),
        status: JoinRequestStatus::Pending,
        created_at,
    })
}

/// Owner decision on a pending join request.
///
/// Uses an IMMEDIATE transaction to acquire the write lock up front: on
/// accept, the role capacity is re-validated at commit time (a concurrent
/// acceptance may have exhausted the role since submission), and the
/// request flip, membership insert, filled-count increment, and status
/// re-derivation commit as one unit or not at all.
pub fn respond_join_request(
    conn: &mut Connection,
    project_id: &str,
    request_id: &str,
    actor_id: &str,
    action: JoinRequestAction,
) -> Result<JoinRequestDecision> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let project: Project = query_one(
        &tx,
        &format!("SELECT {} FROM projects WHERE id = ?1", PROJECT_COLS),
        params![project_id],
    )?
    .ok_or_else(|| AppError::NotFound("Project not found".into()))?;

    if project.owner_id != actor_id {
        return Err(AppError::Forbidden(
            "Only the project owner can respond to join requests".into(),
        ));
    }

    let request: JoinRequest = query_one(
        &tx,
        &format!(
            "SELECT {} FROM join_requests WHERE id = ?1 AND project_id = ?2",
            JOIN_REQUEST_COLS
        ),
        params![request_id, project_id],
    )?
    .ok_or_else(|| AppError::NotFound("Join request not found".into()))?;

    if request.status.is_terminal() {
        return Err(AppError::InvalidState("Join request already resolved".into()));
    }

    if action == JoinRequestAction::Reject {
        tx.execute(
            "UPDATE join_requests SET status = ?1 WHERE id = ?2",
            params![JoinRequestStatus::Rejected.as_ref(), request_id],
        )?;
        tx.commit()?;
        return Ok(JoinRequestDecision {
            request: JoinRequest {
                status: JoinRequestStatus::Rejected,
                ..request
            },
            project_status: project.project_status,
        });
    }

    let role: Option<RoleSlot> = query_one(
        &tx,
        &format!(
            "SELECT {} FROM project_roles WHERE project_id = ?1 AND role_name = ?2",
            ROLE_COLS
        ),
        params![project_id, &request.role_name],
    )?;
    let Some(role) = role.filter(RoleSlot::is_open) else {
        return Err(AppError::CapacityConflict("Role already filled".into()));
    };

    tx.execute(
        "UPDATE join_requests SET status = ?1 WHERE id = ?2",
        params![JoinRequestStatus::Accepted.as_ref(), request_id],
    )?;

    tx.execute(
        "INSERT INTO project_members (project_id, user_id, role_name, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![project_id, &request.user_id, &role.role_name, now()],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Duplicate("User already holds this role".into())
        } else {
            AppError::from(e)
        }
    })?;

    tx.execute(
        "UPDATE project_roles SET filled_positions = filled_positions + 1
         WHERE project_id = ?1 AND role_name = ?2",
        params![project_id, &role.role_name],
    )?;

    // Re-derive the aggregate status from the updated role counts before
    // the same transaction commits, so the stored status never drifts.
    let roles: Vec<RoleSlot> = query_all(
        &tx,
        &format!(
            "SELECT {} FROM project_roles WHERE project_id = ?1 ORDER BY position",
            ROLE_COLS
        ),
        params![project_id],
    )?;
    let status = derive_status(project.project_status, &roles);
    if status != project.project_status {
        tx.execute(
            "UPDATE projects SET project_status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_ref(), now(), project_id],
        )?;
    }

    tx.commit()?;

    Ok(JoinRequestDecision {
        request: JoinRequest {
            status: JoinRequestStatus::Accepted,
            ..request
        },
        project_status: status,
    })
}

pub fn complete_project(conn: &Connection, project_id: &str, actor_id: &str) -> Result<Project> {
    finalize_project(conn, project_id, actor_id, ProjectStatus::Completed)
}

pub fn archive_project(conn: &Connection, project_id: &str, actor_id: &str) -> Result<Project> {
    finalize_project(conn, project_id, actor_id, ProjectStatus::Archived)
}

/// Owner-gated terminal transition. Deliberately not status-gated: the
/// owner may complete or archive from any current status. Always hides
/// the project from listing and matching.
fn finalize_project(
    conn: &Connection,
    project_id: &str,
    actor_id: &str,
    status: ProjectStatus,
) -> Result<Project> {
    let project = get_project_by_id(conn, project_id)?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))?;

    if project.owner_id != actor_id {
        return Err(AppError::Forbidden(
            "Only the project owner can change its status".into(),
        ));
    }

    let updated_at = now();
    conn.execute(
        "UPDATE projects SET project_status = ?1, is_visible = 0, updated_at = ?2 WHERE id = ?3",
        params![status.as_ref(), updated_at, project_id],
    )?;

    Ok(Project {
        project_status: status,
        is_visible: false,
        updated_at,
        ..project
    })
}

// ============ Exchanges ============

pub fn create_exchange(
    conn: &Connection,
    requester_id: &str,
    input: &CreateExchange,
) -> Result<Exchange> {
    if input.target_id == requester_id {
        return Err(AppError::Duplicate(
            "Cannot send an exchange request to yourself".into(),
        ));
    }

    get_user_by_id(conn, &input.target_id)?
        .ok_or_else(|| AppError::NotFound("Target user not found".into()))?;

    let duplicates: i64 = conn.query_row(
        "SELECT COUNT(*) FROM exchanges
         WHERE requester_id = ?1 AND target_id = ?2 AND status IN (?3, ?4)",
        params![
            requester_id,
            &input.target_id,
            ExchangeStatus::Pending.as_ref(),
            ExchangeStatus::Accepted.as_ref()
        ],
        |row| row.get(0),
    )?;
    if duplicates > 0 {
        return Err(AppError::Duplicate("Duplicate exchange request".into()));
    }

    let id = gen_id();
    let now = now();
    conn.execute(
        "INSERT INTO exchanges (id, requester_id, target_id, offered_skill, requested_skill,
                                message, status, is_visible, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?9)",
        params![
            &id,
            requester_id,
            &input.target_id,
            &input.offered_skill,
            &input.requested_skill,
            &input.message,
            ExchangeStatus::Pending.as_ref(),
            now,
            now
        ],
    )?;

    Ok(Exchange {
        id,
        requester_id: requester_id.to_string(),
        target_id: input.target_id.clone(),
        offered_skill: input.offered_skill.clone(),
        requested_skill: input.requested_skill.clone(),
        message: input.message.clone(),
        status: ExchangeStatus::Pending,
        is_visible: true,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_exchange_by_id(conn: &Connection, id: &str) -> Result<Option<Exchange>> {
    query_one(
        conn,
        &format!("SELECT {} FROM exchanges WHERE id = ?1", EXCHANGE_COLS),
        params![id],
    )
}

/// Pending, visible exchange requests, newest first.
pub fn browse_exchanges(conn: &Connection) -> Result<Vec<Exchange>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM exchanges
             WHERE status = ?1 AND is_visible = 1
             ORDER BY created_at DESC",
            EXCHANGE_COLS
        ),
        params![ExchangeStatus::Pending.as_ref()],
    )
}

/// Every exchange a user participates in, either side, newest first.
pub fn list_exchanges_for_user(conn: &Connection, user_id: &str) -> Result<Vec<Exchange>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM exchanges
             WHERE requester_id = ?1 OR target_id = ?1
             ORDER BY created_at DESC",
            EXCHANGE_COLS
        ),
        params![user_id],
    )
}

pub fn respond_exchange(
    conn: &Connection,
    exchange_id: &str,
    actor_id: &str,
    action: ExchangeAction,
) -> Result<Exchange> {
    let exchange = get_exchange_by_id(conn, exchange_id)?
        .ok_or_else(|| AppError::NotFound("Exchange not found".into()))?;

    if exchange.target_id != actor_id {
        return Err(AppError::Forbidden(
            "Only the target user can respond to an exchange".into(),
        ));
    }
    if exchange.status != ExchangeStatus::Pending {
        return Err(AppError::InvalidState("Exchange already processed".into()));
    }

    let (status, visible) = match action {
        ExchangeAction::Accept => (ExchangeStatus::Accepted, exchange.is_visible),
        ExchangeAction::Reject => (ExchangeStatus::Rejected, false),
    };

    let updated_at = now();
    conn.execute(
        "UPDATE exchanges SET status = ?1, is_visible = ?2, updated_at = ?3 WHERE id = ?4",
        params![status.as_ref(), visible, updated_at, exchange_id],
    )?;

    Ok(Exchange {
        status,
        is_visible: visible,
        updated_at,
        ..exchange
    })
}

pub fn complete_exchange(conn: &Connection, exchange_id: &str, actor_id: &str) -> Result<Exchange> {
    let exchange = get_exchange_by_id(conn, exchange_id)?
        .ok_or_else(|| AppError::NotFound("Exchange not found".into()))?;

    let is_participant = exchange.requester_id == actor_id || exchange.target_id == actor_id;
    if !is_participant {
        return Err(AppError::Forbidden(
            "Only participants can complete an exchange".into(),
        ));
    }
    if exchange.status != ExchangeStatus::Accepted {
        return Err(AppError::InvalidState("Exchange not accepted".into()));
    }

    let updated_at = now();
    conn.execute(
        "UPDATE exchanges SET status = ?1, is_visible = 0, updated_at = ?2 WHERE id = ?3",
        params![ExchangeStatus::Completed.as_ref(), updated_at, exchange_id],
    )?;

    Ok(Exchange {
        status: ExchangeStatus::Completed,
        is_visible: false,
        updated_at,
        ..exchange
    })
}
