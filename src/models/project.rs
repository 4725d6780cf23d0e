use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use super::user::{UserBrief, UserProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProjectStatus {
    Open,
    InProgress,
    Completed,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JoinRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl JoinRequestStatus {
    /// Accepted and Rejected are terminal; no transition leaves them.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JoinRequestStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JoinRequestAction {
    Accept,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    pub owner_id: String,
    pub project_status: ProjectStatus,
    pub is_visible: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One named position type within a project with a fixed headcount.
/// Invariant: `0 <= filled_positions <= number_of_openings`, enforced both
/// here and by a CHECK constraint on the table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleSlot {
    pub role_name: String,
    pub required_skills: Vec<String>,
    pub number_of_openings: i32,
    pub filled_positions: i32,
}

impl RoleSlot {
    pub fn is_open(&self) -> bool {
        self.filled_positions < self.number_of_openings
    }
}

/// True iff any slot still has an opening.
pub fn has_open_role(roles: &[RoleSlot]) -> bool {
    roles.iter().any(RoleSlot::is_open)
}

/// Aggregate status from role fulfillment: once every slot is at capacity
/// the project is in progress. This never demotes a project back to Open
/// (members cannot leave), and terminal states are set only by the owner.
pub fn derive_status(current: ProjectStatus, roles: &[RoleSlot]) -> ProjectStatus {
    if current == ProjectStatus::Open && !has_open_role(roles) {
        ProjectStatus::InProgress
    } else {
        current
    }
}

/// A confirmed assignment of a user to a role. Set semantics are keyed by
/// `(user, role_name)` within a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMember {
    pub user_id: String,
    pub role_name: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub id: String,
    pub project_id: String,
    pub user_id: String,
    pub role_name: String,
    pub status: JoinRequestStatus,
    pub created_at: i64,
}

// ---- inputs ----

#[derive(Debug, Deserialize)]
pub struct CreateProject {
    pub title: String,
    pub description: String,
    pub required_roles: Vec<CreateRoleSlot>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoleSlot {
    pub role_name: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    pub number_of_openings: i32,
}

#[derive(Debug, Deserialize)]
pub struct SubmitJoinRequest {
    pub role_name: String,
}

#[derive(Debug, Deserialize)]
pub struct RespondToJoinRequest {
    pub request_id: String,
    pub action: JoinRequestAction,
}

// ---- response shapes ----

#[derive(Debug, Serialize)]
pub struct ProjectWithRoles {
    #[serde(flatten)]
    pub project: Project,
    pub required_roles: Vec<RoleSlot>,
}

/// Project as returned by list and match endpoints.
#[derive(Debug, Serialize)]
pub struct ProjectCard {
    pub id: String,
    pub title: String,
    pub description: String,
    pub project_status: ProjectStatus,
    pub required_roles: Vec<RoleSlot>,
    pub owner: UserBrief,
    pub created_at: i64,
}

/// Outcome of an owner's decision on a join request.
#[derive(Debug, Serialize)]
pub struct JoinRequestDecision {
    pub request: JoinRequest,
    pub project_status: ProjectStatus,
}

#[derive(Debug, Serialize)]
pub struct MemberView {
    pub user: UserProfile,
    pub role_name: String,
}

/// Full project view with viewer-dependent contact redaction.
#[derive(Debug, Serialize)]
pub struct ProjectView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub owner: UserProfile,
    pub required_roles: Vec<RoleSlot>,
    pub members: Vec<MemberView>,
    pub join_requests: Vec<JoinRequest>,
    pub project_status: ProjectStatus,
    pub is_visible: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ProjectView {
    /// Assemble the response copy for a viewer. Contact fields of the owner
    /// and of every member are stripped unless the viewer is the owner or a
    /// member; anonymous viewers are always non-participants. Operates on
    /// owned response data only, stored rows are untouched.
    pub fn assemble(
        project: Project,
        roles: Vec<RoleSlot>,
        owner: UserProfile,
        members: Vec<(ProjectMember, UserProfile)>,
        join_requests: Vec<JoinRequest>,
        viewer: Option<&str>,
    ) -> Self {
        let is_owner = viewer == Some(project.owner_id.as_str());
        let is_member = viewer
            .map(|v| members.iter().any(|(m, _)| m.user_id == v))
            .unwrap_or(false);
        let participant = is_owner || is_member;

        let owner = if participant { owner } else { owner.redacted() };
        let members = members
            .into_iter()
            .map(|(m, profile)| MemberView {
                user: if participant {
                    profile
                } else {
                    profile.redacted()
                },
                role_name: m.role_name,
            })
            .collect();

        Self {
            id: project.id,
            title: project.title,
            description: project.description,
            owner,
            required_roles: roles,
            members,
            join_requests,
            project_status: project.project_status,
            is_visible: project.is_visible,
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}
