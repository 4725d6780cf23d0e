//! Row-mapping helpers: column lists, the [`FromRow`] trait, and the
//! `query_one`/`query_all` convenience wrappers used by `queries`.

use rusqlite::types::Type;
use rusqlite::{Connection, Params, Row};

use crate::error::Result;
use crate::models::*;

pub const USER_COLS: &str = "id, full_name, roll_number, email, phone_number, password_hash, \
     department, year, bio, github, linkedin, profile_image, \
     skills_known, skills_wanted, interests, rating, total_ratings, \
     is_active, created_at, updated_at";

pub const PROJECT_COLS: &str =
    "id, title, description, owner_id, project_status, is_visible, created_at, updated_at";

pub const ROLE_COLS: &str = "role_name, required_skills, number_of_openings, filled_positions";

pub const MEMBER_COLS: &str = "user_id, role_name, created_at";

pub const JOIN_REQUEST_COLS: &str = "id, project_id, user_id, role_name, status, created_at";

pub const EXCHANGE_COLS: &str = "id, requester_id, target_id, offered_skill, requested_skill, \
     message, status, is_visible, created_at, updated_at";

pub trait FromRow: Sized {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

pub fn query_one<T: FromRow, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Option<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query_map(params, T::from_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn query_all<T: FromRow, P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, T::from_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

/// Decode a JSON text column.
fn json_col<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Decode a strum-backed enum column.
fn enum_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

impl FromRow for User {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            full_name: row.get(1)?,
            roll_number: row.get(2)?,
            email: row.get(3)?,
            phone_number: row.get(4)?,
            password_hash: row.get(5)?,
            department: row.get(6)?,
            year: row.get(7)?,
            bio: row.get(8)?,
            github: row.get(9)?,
            linkedin: row.get(10)?,
            profile_image: row.get(11)?,
            skills_known: json_col(row, 12)?,
            skills_wanted: json_col(row, 13)?,
            interests: json_col(row, 14)?,
            rating: row.get(15)?,
            total_ratings: row.get(16)?,
            is_active: row.get(17)?,
            created_at: row.get(18)?,
            updated_at: row.get(19)?,
        })
    }
}

impl FromRow for Project {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Project {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            owner_id: row.get(3)?,
            project_status: enum_col(row, 4)?,
            is_visible: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

impl FromRow for RoleSlot {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(RoleSlot {
            role_name: row.get(0)?,
            required_skills: json_col(row, 1)?,
            number_of_openings: row.get(2)?,
            filled_positions: row.get(3)?,
        })
    }
}

impl FromRow for ProjectMember {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ProjectMember {
            user_id: row.get(0)?,
            role_name: row.get(1)?,
            created_at: row.get(2)?,
        })
    }
}

impl FromRow for JoinRequest {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(JoinRequest {
            id: row.get(0)?,
            project_id: row.get(1)?,
            user_id: row.get(2)?,
            role_name: row.get(3)?,
            status: enum_col(row, 4)?,
            created_at: row.get(5)?,
        })
    }
}

impl FromRow for Exchange {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Exchange {
            id: row.get(0)?,
            requester_id: row.get(1)?,
            target_id: row.get(2)?,
            offered_skill: row.get(3)?,
            requested_skill: row.get(4)?,
            message: row.get(5)?,
            status: enum_col(row, 6)?,
            is_visible: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}
