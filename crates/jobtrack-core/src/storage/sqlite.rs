//! Indexed backend: SQLite tables with secondary indexes
//!
//! Each table keeps the full record as JSON in a `data` column and copies
//! the queried fields (owner, foreign key, status, date, ...) into indexed
//! columns at write time. Multi-step writes (cascading delete, import
//! replace, status change) run inside one SQLite transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Params, Transaction};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::backend::{BackendKind, CascadeOutcome, StorageBackend, StorageInfo};
use super::db::Database;
use crate::error::{StorageError, StorageResult};
use crate::model::{Application, ApplicationStatus, Company, StoredUser, User, UserData};

/// Storage backend over a single SQLite database
pub struct SqliteBackend {
    db: Mutex<Database>,
}

impl SqliteBackend {
    /// Open (creating and migrating if needed) the database at `path`
    ///
    /// # Errors
    /// Returns [`StorageError::BackendUnavailable`] if the database cannot be opened
    pub fn open(path: &Path) -> StorageResult<Self> {
        let db = Database::open(path).map_err(|e| {
            StorageError::BackendUnavailable(format!("{}: {e}", path.display()))
        })?;
        Ok(Self::from_database(db))
    }

    /// Open a private in-memory database (for testing)
    ///
    /// # Errors
    /// Returns [`StorageError::BackendUnavailable`] if the database cannot be created
    pub fn in_memory() -> StorageResult<Self> {
        let db = Database::in_memory()
            .map_err(|e| StorageError::BackendUnavailable(e.to_string()))?;
        Ok(Self::from_database(db))
    }

    fn from_database(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn lock(&self) -> MutexGuard<'_, Database> {
        // Handle mutex poisoning by recovering the lock
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn query_one<T: DeserializeOwned, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> StorageResult<Option<T>> {
    let result = conn.query_row(sql, params, |row| row.get::<_, String>(0));
    match result {
        Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn query_all<T: DeserializeOwned, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> StorageResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| row.get::<_, String>(0))?;

    let mut records = Vec::new();
    for row in rows {
        records.push(serde_json::from_str(&row?)?);
    }
    Ok(records)
}

/// Record ids are scoped per owner, so a conflict only ever hits the owner's own row.
fn upsert_company(conn: &Connection, owner_id: &str, company: &Company) -> StorageResult<()> {
    let json = serde_json::to_string(company)?;
    conn.execute(
        r"
        INSERT INTO companies (user_id, id, name, location, data)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(user_id, id) DO UPDATE
            SET name = excluded.name, location = excluded.location, data = excluded.data
        ",
        params![owner_id, company.id, company.name, company.location, json],
    )?;
    Ok(())
}

fn upsert_application(
    conn: &Connection,
    owner_id: &str,
    application: &Application,
) -> StorageResult<()> {
    let json = serde_json::to_string(application)?;
    conn.execute(
        r"
        INSERT INTO applications (user_id, id, company_id, status, date_applied, data)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(user_id, id) DO UPDATE
            SET company_id = excluded.company_id, status = excluded.status,
                date_applied = excluded.date_applied, data = excluded.data
        ",
        params![
            owner_id,
            application.id,
            application.company_id,
            application.status.as_str(),
            application.date_applied.to_string(),
            json,
        ],
    )?;
    Ok(())
}

fn stored_user_by_id(conn: &Connection, user_id: &str) -> StorageResult<Option<StoredUser>> {
    query_one(conn, "SELECT data FROM users WHERE id = ?1", params![user_id])
}

fn delete_owned(tx: &Transaction<'_>, owner_id: &str) -> StorageResult<(usize, usize)> {
    let companies = tx.execute("DELETE FROM companies WHERE user_id = ?1", params![owner_id])?;
    let applications =
        tx.execute("DELETE FROM applications WHERE user_id = ?1", params![owner_id])?;
    Ok((companies, applications))
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Indexed
    }

    fn info(&self) -> StorageInfo {
        StorageInfo {
            backend: BackendKind::Indexed,
            estimated_size: "Limited by disk space".to_string(),
            features: vec![
                "Indexed queries".to_string(),
                "Transactional".to_string(),
                "Cascading deletes in one transaction".to_string(),
                "Large storage capacity".to_string(),
            ],
        }
    }

    async fn put_user(&self, user: &StoredUser) -> StorageResult<()> {
        let mut db = self.lock();
        let tx = db.connection_mut().transaction()?;

        let existing_email: Option<String> = match tx.query_row(
            "SELECT email FROM users WHERE id = ?1",
            params![user.user.id],
            |row| row.get(0),
        ) {
            Ok(email) => Some(email),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(e.into()),
        };
        if existing_email.is_some_and(|email| email != user.user.email) {
            return Err(StorageError::DuplicateUserId(user.user.id.clone()));
        }

        let json = serde_json::to_string(user)?;
        tx.execute(
            r"
            INSERT INTO users (email, id, data) VALUES (?1, ?2, ?3)
            ON CONFLICT(email) DO UPDATE SET id = excluded.id, data = excluded.data
            ",
            params![user.user.email, user.user.id, json],
        )?;
        tx.commit()?;
        Ok(())
    }

    async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<StoredUser>> {
        let db = self.lock();
        query_one(
            db.connection(),
            "SELECT data FROM users WHERE email = ?1",
            params![email],
        )
    }

    async fn get_user_by_id(&self, user_id: &str) -> StorageResult<Option<User>> {
        let db = self.lock();
        Ok(stored_user_by_id(db.connection(), user_id)?.map(StoredUser::into_user))
    }

    async fn user_exists(&self, email: &str) -> StorageResult<bool> {
        let db = self.lock();
        let count: i64 = db.connection().query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    async fn touch_last_login(&self, user_id: &str, at: DateTime<Utc>) -> StorageResult<bool> {
        let mut db = self.lock();
        let tx = db.connection_mut().transaction()?;

        let Some(mut stored) = stored_user_by_id(&tx, user_id)? else {
            return Ok(false);
        };
        stored.user.last_login = at;
        tx.execute(
            "UPDATE users SET data = ?1 WHERE id = ?2",
            params![serde_json::to_string(&stored)?, user_id],
        )?;
        tx.commit()?;
        Ok(true)
    }

    async fn put_company(&self, owner_id: &str, company: &Company) -> StorageResult<()> {
        let db = self.lock();
        upsert_company(db.connection(), owner_id, company)
    }

    async fn get_company(
        &self,
        owner_id: &str,
        company_id: &str,
    ) -> StorageResult<Option<Company>> {
        let db = self.lock();
        query_one(
            db.connection(),
            "SELECT data FROM companies WHERE id = ?1 AND user_id = ?2",
            params![company_id, owner_id],
        )
    }

    async fn list_companies(&self, owner_id: &str) -> StorageResult<Vec<Company>> {
        let db = self.lock();
        query_all(
            db.connection(),
            "SELECT data FROM companies WHERE user_id = ?1 ORDER BY rowid",
            params![owner_id],
        )
    }

    async fn delete_company(
        &self,
        owner_id: &str,
        company_id: &str,
    ) -> StorageResult<CascadeOutcome> {
        let mut db = self.lock();
        let tx = db.connection_mut().transaction()?;

        let companies = tx.execute(
            "DELETE FROM companies WHERE id = ?1 AND user_id = ?2",
            params![company_id, owner_id],
        )?;
        let applications = tx.execute(
            "DELETE FROM applications WHERE company_id = ?1 AND user_id = ?2",
            params![company_id, owner_id],
        )?;
        tx.commit()?;

        Ok(CascadeOutcome {
            company_deleted: companies > 0,
            applications_deleted: applications,
        })
    }

    async fn put_application(
        &self,
        owner_id: &str,
        application: &Application,
    ) -> StorageResult<()> {
        let db = self.lock();
        upsert_application(db.connection(), owner_id, application)
    }

    async fn get_application(
        &self,
        owner_id: &str,
        application_id: &str,
    ) -> StorageResult<Option<Application>> {
        let db = self.lock();
        query_one(
            db.connection(),
            "SELECT data FROM applications WHERE id = ?1 AND user_id = ?2",
            params![application_id, owner_id],
        )
    }

    async fn list_applications(&self, owner_id: &str) -> StorageResult<Vec<Application>> {
        let db = self.lock();
        query_all(
            db.connection(),
            "SELECT data FROM applications WHERE user_id = ?1 ORDER BY rowid",
            params![owner_id],
        )
    }

    async fn list_applications_for_company(
        &self,
        owner_id: &str,
        company_id: &str,
    ) -> StorageResult<Vec<Application>> {
        let db = self.lock();
        query_all(
            db.connection(),
            "SELECT data FROM applications WHERE company_id = ?1 AND user_id = ?2 ORDER BY rowid",
            params![company_id, owner_id],
        )
    }

    async fn delete_application(
        &self,
        owner_id: &str,
        application_id: &str,
    ) -> StorageResult<bool> {
        let db = self.lock();
        let deleted = db.connection().execute(
            "DELETE FROM applications WHERE id = ?1 AND user_id = ?2",
            params![application_id, owner_id],
        )?;
        Ok(deleted > 0)
    }

    async fn update_application_status(
        &self,
        owner_id: &str,
        application_id: &str,
        status: ApplicationStatus,
    ) -> StorageResult<bool> {
        let mut db = self.lock();
        let tx = db.connection_mut().transaction()?;

        let Some(mut application) = query_one::<Application, _>(
            &tx,
            "SELECT data FROM applications WHERE id = ?1 AND user_id = ?2",
            params![application_id, owner_id],
        )?
        else {
            return Ok(false);
        };

        application.status = status;
        tx.execute(
            "UPDATE applications SET status = ?1, data = ?2 WHERE id = ?3 AND user_id = ?4",
            params![
                status.as_str(),
                serde_json::to_string(&application)?,
                application_id,
                owner_id,
            ],
        )?;
        tx.commit()?;
        Ok(true)
    }

    async fn export_user_data(&self, user_id: &str) -> StorageResult<Option<UserData>> {
        let db = self.lock();
        let conn = db.connection();

        let Some(stored) = stored_user_by_id(conn, user_id)? else {
            return Ok(None);
        };
        let companies = query_all(
            conn,
            "SELECT data FROM companies WHERE user_id = ?1 ORDER BY rowid",
            params![user_id],
        )?;
        let applications = query_all(
            conn,
            "SELECT data FROM applications WHERE user_id = ?1 ORDER BY rowid",
            params![user_id],
        )?;

        Ok(Some(UserData {
            user: stored.into_user(),
            companies,
            applications,
        }))
    }

    async fn replace_user_data(
        &self,
        owner_id: &str,
        companies: &[Company],
        applications: &[Application],
    ) -> StorageResult<()> {
        let mut db = self.lock();
        let tx = db.connection_mut().transaction()?;

        let (old_companies, old_applications) = delete_owned(&tx, owner_id)?;
        for company in companies {
            upsert_company(&tx, owner_id, company)?;
        }
        for application in applications {
            upsert_application(&tx, owner_id, application)?;
        }
        tx.commit()?;

        tracing::debug!(
            owner_id,
            old_companies,
            old_applications,
            companies = companies.len(),
            applications = applications.len(),
            "Replaced user data"
        );
        Ok(())
    }

    async fn clear_all(&self) -> StorageResult<()> {
        let mut db = self.lock();
        let tx = db.connection_mut().transaction()?;
        tx.execute_batch(
            r"
            DELETE FROM applications;
            DELETE FROM companies;
            DELETE FROM users;
            ",
        )?;
        tx.commit()?;
        Ok(())
    }
}
