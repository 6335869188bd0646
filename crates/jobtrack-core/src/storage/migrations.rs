//! Database migrations

use rusqlite::Connection;

use super::db::DatabaseError;

pub const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
///
/// Opening a database that is already at [`CURRENT_VERSION`] creates
/// nothing.
///
/// # Errors
/// Returns an error if migrations fail
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version > CURRENT_VERSION {
        return Err(DatabaseError::Migration(format!(
            "database schema version {version} is newer than supported version {CURRENT_VERSION}"
        )));
    }

    if version < 1 {
        migrate_v1(conn)?;
    }

    conn.pragma_update(None, "user_version", CURRENT_VERSION)?;
    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        r"
        -- Users, keyed by login email
        -- Full record (including credential) as JSON in data column
        CREATE TABLE IF NOT EXISTS users (
            email TEXT PRIMARY KEY,
            id TEXT NOT NULL UNIQUE,
            data TEXT NOT NULL
        );

        -- Companies; ids are unique per owner, not globally
        CREATE TABLE IF NOT EXISTS companies (
            user_id TEXT NOT NULL,
            id TEXT NOT NULL,
            name TEXT NOT NULL,
            location TEXT NOT NULL,
            data TEXT NOT NULL,
            PRIMARY KEY (user_id, id)
        );

        -- Applications; company_id is not a SQL foreign key so that
        -- orphans stay representable and detectable
        CREATE TABLE IF NOT EXISTS applications (
            user_id TEXT NOT NULL,
            id TEXT NOT NULL,
            company_id TEXT NOT NULL,
            status TEXT NOT NULL,
            date_applied TEXT NOT NULL,
            data TEXT NOT NULL,
            PRIMARY KEY (user_id, id)
        );

        -- Indexes
        CREATE INDEX IF NOT EXISTS idx_users_id ON users(id);
        CREATE INDEX IF NOT EXISTS idx_companies_user ON companies(user_id);
        CREATE INDEX IF NOT EXISTS idx_companies_name ON companies(name);
        CREATE INDEX IF NOT EXISTS idx_companies_location ON companies(location);
        CREATE INDEX IF NOT EXISTS idx_applications_user ON applications(user_id);
        CREATE INDEX IF NOT EXISTS idx_applications_company ON applications(company_id);
        CREATE INDEX IF NOT EXISTS idx_applications_status ON applications(status);
        CREATE INDEX IF NOT EXISTS idx_applications_date ON applications(date_applied);
        ",
    )?;

    Ok(())
}
