//! Development-only endpoints. Mounted solely when dev mode is enabled.

use axum::{Router, extract::State, routing::post};
use serde::Serialize;

use crate::crypto::hash_password;
use crate::db::{AppState, queries};
use crate::error::Result;
use crate::extractors::Json;
use crate::models::{CreateProject, CreateRoleSlot, RegisterUser, Skill, UpdateUser};

#[derive(Debug, Serialize)]
pub struct SeedSummary {
    pub user_ids: Vec<String>,
    pub project_id: Option<String>,
}

/// Insert a small fixture set for manual testing: two users (password
/// "password"), skills for the first, and one open project owned by the
/// second. Safe to call repeatedly.
pub async fn seed(State(state): State<AppState>) -> Result<Json<SeedSummary>> {
    let mut conn = state.db.get()?;

    let fixtures = [
        ("Asha Patel", "CS-2024-001", "asha@campus.test"),
        ("Rohan Mehta", "CS-2024-002", "rohan@campus.test"),
    ];

    let mut user_ids = Vec::new();
    for (full_name, roll_number, email) in fixtures {
        let user = match queries::get_user_by_email(&conn, email)? {
            Some(existing) => existing,
            None => queries::create_user(
                &conn,
                &RegisterUser {
                    full_name: full_name.to_string(),
                    roll_number: roll_number.to_string(),
                    email: email.to_string(),
                    password: "password".to_string(),
                    phone_number: None,
                    department: Some("CSE".to_string()),
                    year: Some("3".to_string()),
                },
                &hash_password("password"),
            )?,
        };
        user_ids.push(user.id);
    }

    queries::update_user(
        &conn,
        &user_ids[0],
        &UpdateUser {
            full_name: None,
            phone_number: None,
            department: None,
            year: None,
            bio: None,
            github: None,
            linkedin: None,
            profile_image: None,
            skills_known: Some(vec![
                Skill {
                    name: "Rust".to_string(),
                    level: Some("intermediate".to_string()),
                },
                Skill {
                    name: "SQL".to_string(),
                    level: None,
                },
            ]),
            skills_wanted: None,
            interests: None,
        },
    )?;

    let already_seeded = queries::list_open_projects(&conn)?
        .iter()
        .any(|p| p.owner_id == user_ids[1]);

    let project_id = if already_seeded {
        None
    } else {
        let created = queries::create_project(
            &mut conn,
            &user_ids[1],
            &CreateProject {
                title: "Campus Events Portal".to_string(),
                description: "A portal for discovering and organizing campus events".to_string(),
                required_roles: vec![
                    CreateRoleSlot {
                        role_name: "Backend".to_string(),
                        required_skills: vec!["Rust".to_string(), "SQL".to_string()],
                        number_of_openings: 2,
                    },
                    CreateRoleSlot {
                        role_name: "Frontend".to_string(),
                        required_skills: vec!["TypeScript".to_string()],
                        number_of_openings: 1,
                    },
                ],
            },
        )?;
        Some(created.project.id)
    };

    tracing::info!("DEV: seeded fixture users and project");

    Ok(Json(SeedSummary {
        user_ids,
        project_id,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/dev/seed", post(seed))
}
