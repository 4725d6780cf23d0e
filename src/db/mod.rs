pub mod from_row;
pub mod queries;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::config::Config;
use crate::jwt::JwtKeys;

pub type DbPool = r2d2::Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub jwt: JwtKeys,
    pub dev_mode: bool,
}

impl AppState {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let db = build_pool(&config.database_path)?;
        init_schema(&*db.get()?)?;
        Ok(Self {
            db,
            jwt: JwtKeys::from_secret(&config.jwt_secret),
            dev_mode: config.dev_mode,
        })
    }
}

fn configure_connection(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )
}

pub fn build_pool(path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(path).with_init(configure_connection);
    r2d2::Pool::new(manager)
}

/// Create all tables and indexes. Idempotent; run at startup.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            roll_number TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            phone_number TEXT,
            password_hash TEXT NOT NULL,
            department TEXT,
            year TEXT,
            bio TEXT,
            github TEXT,
            linkedin TEXT,
            profile_image TEXT,
            skills_known TEXT NOT NULL DEFAULT '[]',
            skills_wanted TEXT NOT NULL DEFAULT '[]',
            interests TEXT NOT NULL DEFAULT '[]',
            rating REAL NOT NULL DEFAULT 0,
            total_ratings INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            owner_id TEXT NOT NULL REFERENCES users(id),
            project_status TEXT NOT NULL DEFAULT 'open',
            is_visible INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_projects_status
            ON projects(project_status, is_visible);

        CREATE TABLE IF NOT EXISTS project_roles (
            project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            role_name TEXT NOT NULL,
            required_skills TEXT NOT NULL DEFAULT '[]',
            number_of_openings INTEGER NOT NULL
                CHECK (number_of_openings >= 1),
            filled_positions INTEGER NOT NULL DEFAULT 0
                CHECK (filled_positions >= 0
                       AND filled_positions <= number_of_openings),
            position INTEGER NOT NULL,
            PRIMARY KEY (project_id, role_name)
        );

        CREATE TABLE IF NOT EXISTS project_members (
            project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL REFERENCES users(id),
            role_name TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            PRIMARY KEY (project_id, user_id, role_name)
        );

        CREATE TABLE IF NOT EXISTS join_requests (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL REFERENCES users(id),
            role_name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_join_requests_project
            ON join_requests(project_id);

        CREATE TABLE IF NOT EXISTS exchanges (
            id TEXT PRIMARY KEY,
            requester_id TEXT NOT NULL REFERENCES users(id),
            target_id TEXT NOT NULL REFERENCES users(id),
            offered_skill TEXT NOT NULL,
            requested_skill TEXT NOT NULL,
            message TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            is_visible INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_exchanges_requester
            ON exchanges(requester_id);
        CREATE INDEX IF NOT EXISTS idx_exchanges_target
            ON exchanges(target_id);",
    )
}
