//! The storage facade: the only entry point the rest of the program uses
//!
//! [`Storage`] picks a backend once (SQLite if it opens, the flat store
//! otherwise) and then routes every call to it. The same async contract,
//! validation and integrity rules apply whichever backend is active.
//!
//! ## Lifecycle
//!
//! `Uninitialized → Initializing → Ready(Indexed | Flat)`. Every operation
//! initializes on first use; calling [`Storage::init`] again once ready is a
//! no-op.
//!
//! ## Session scoping
//!
//! [`Storage::update_company`] and [`Storage::update_application`] take the
//! acting user from the [`SessionStore`] rather than from the caller, and
//! fail with [`StorageError::NoActiveSession`] when nobody is logged in.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::config::{BackendPreference, StorageConfig};
use crate::error::{StorageError, StorageResult};
use crate::export::{parse_backup, to_backup_json, ImportPreview};
use crate::model::{Application, ApplicationStatus, Company, StoredUser, User, UserData};
use crate::session::{FileSession, SessionStore};
use crate::storage::{
    BackendKind, CascadeOutcome, FileKeyValueStore, FlatBackend, SqliteBackend, StorageBackend,
    StorageInfo,
};
use crate::validation::{validate_application, validate_company, validate_user_id};

/// Where the facade is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageState {
    Uninitialized,
    Initializing,
    Ready(BackendKind),
}

/// Shared storage handle; construct once and pass it around
pub struct Storage {
    config: StorageConfig,
    session: Arc<dyn SessionStore>,
    backend: OnceCell<Box<dyn StorageBackend>>,
    initializing: AtomicBool,
}

impl Storage {
    /// Create an uninitialized facade
    #[must_use]
    pub fn new(config: StorageConfig, session: Arc<dyn SessionStore>) -> Self {
        Self {
            config,
            session,
            backend: OnceCell::new(),
            initializing: AtomicBool::new(false),
        }
    }

    /// Create a facade with the session persisted next to the data
    #[must_use]
    pub fn with_file_session(config: StorageConfig) -> Self {
        let session = Arc::new(FileSession::new(&config.session_path()));
        Self::new(config, session)
    }

    /// Create a facade that is already ready with the given backend
    #[must_use]
    pub fn with_backend(backend: Box<dyn StorageBackend>, session: Arc<dyn SessionStore>) -> Self {
        Self {
            config: StorageConfig::default(),
            session,
            backend: OnceCell::new_with(Some(backend)),
            initializing: AtomicBool::new(false),
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> StorageState {
        match self.backend.get() {
            Some(backend) => StorageState::Ready(backend.kind()),
            None if self.initializing.load(Ordering::Acquire) => StorageState::Initializing,
            None => StorageState::Uninitialized,
        }
    }

    /// Select and open a backend; idempotent
    ///
    /// # Errors
    /// Returns an error only if neither backend can be opened
    pub async fn init(&self) -> StorageResult<BackendKind> {
        Ok(self.backend().await?.kind())
    }

    async fn backend(&self) -> StorageResult<&dyn StorageBackend> {
        let backend = self
            .backend
            .get_or_try_init(|| async {
                self.initializing.store(true, Ordering::Release);
                let selected = select_backend(&self.config);
                self.initializing.store(false, Ordering::Release);
                selected
            })
            .await?;
        Ok(backend.as_ref())
    }

    /// The session this facade resolves the acting user from
    #[must_use]
    pub fn session(&self) -> &dyn SessionStore {
        self.session.as_ref()
    }

    fn acting_user_id(&self) -> StorageResult<String> {
        self.session
            .current_user_id()?
            .ok_or(StorageError::NoActiveSession)
    }

    /// Which backend is active and roughly how much it holds
    ///
    /// # Errors
    /// Returns an error if no backend can be opened
    pub async fn storage_info(&self) -> StorageResult<StorageInfo> {
        Ok(self.backend().await?.info())
    }

    // --- Users ---

    /// Insert or replace a user (keyed by email)
    ///
    /// # Errors
    /// Returns an error if the id is taken by another email or the write fails
    pub async fn save_user(&self, user: &StoredUser) -> StorageResult<()> {
        validate_user_id(&user.user.id)?;
        if user.user.email.trim().is_empty() {
            return Err(StorageError::Validation("user email cannot be empty".to_string()));
        }
        self.backend().await?.put_user(user).await
    }

    /// # Errors
    /// Returns an error if the backend cannot be read
    pub async fn get_user(&self, email: &str) -> StorageResult<Option<StoredUser>> {
        self.backend().await?.get_user_by_email(email).await
    }

    /// # Errors
    /// Returns an error if the backend cannot be read
    pub async fn get_user_by_id(&self, user_id: &str) -> StorageResult<Option<User>> {
        self.backend().await?.get_user_by_id(user_id).await
    }

    /// # Errors
    /// Returns an error if the backend cannot be read
    pub async fn user_exists(&self, email: &str) -> StorageResult<bool> {
        self.backend().await?.user_exists(email).await
    }

    /// Stamp `last_login` with the current time
    ///
    /// # Errors
    /// Returns an error if the write fails
    pub async fn record_login(&self, user_id: &str) -> StorageResult<bool> {
        self.backend()
            .await?
            .touch_last_login(user_id, Utc::now())
            .await
    }

    /// Record a login and make `user_id` the session user
    ///
    /// # Errors
    /// Returns an error if the user record or the session cannot be written
    pub async fn login(&self, user_id: &str) -> StorageResult<()> {
        if !self.record_login(user_id).await? {
            return Err(StorageError::Validation(format!("unknown user id '{user_id}'")));
        }
        self.session.set_current_user_id(Some(user_id))
    }

    /// Clear the session
    ///
    /// # Errors
    /// Returns an error if the session cannot be written
    pub fn logout(&self) -> StorageResult<()> {
        self.session.set_current_user_id(None)
    }

    /// The logged-in user, if any
    ///
    /// # Errors
    /// Returns an error if the session or backend cannot be read
    pub async fn current_user(&self) -> StorageResult<Option<User>> {
        match self.session.current_user_id()? {
            Some(user_id) => self.get_user_by_id(&user_id).await,
            None => Ok(None),
        }
    }

    /// Change the display name of the logged-in user, keeping the credential
    ///
    /// # Errors
    /// Returns [`StorageError::NoActiveSession`] if nobody is logged in
    pub async fn update_current_user_profile(&self, name: &str) -> StorageResult<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StorageError::Validation("name cannot be empty".to_string()));
        }

        let user_id = self.acting_user_id()?;
        let backend = self.backend().await?;
        let user = backend
            .get_user_by_id(&user_id)
            .await?
            .ok_or(StorageError::NoActiveSession)?;
        let mut stored = backend
            .get_user_by_email(&user.email)
            .await?
            .ok_or(StorageError::NoActiveSession)?;

        stored.user.name = name.to_string();
        backend.put_user(&stored).await?;
        Ok(stored.into_user())
    }

    // --- Companies ---

    /// # Errors
    /// Returns an error if the company is invalid or the write fails
    pub async fn save_company(&self, user_id: &str, company: &Company) -> StorageResult<()> {
        validate_company(company)?;
        self.backend().await?.put_company(user_id, company).await
    }

    /// # Errors
    /// Returns an error if the backend cannot be read
    pub async fn companies(&self, user_id: &str) -> StorageResult<Vec<Company>> {
        self.backend().await?.list_companies(user_id).await
    }

    /// # Errors
    /// Returns an error if the backend cannot be read
    pub async fn company(&self, user_id: &str, company_id: &str) -> StorageResult<Option<Company>> {
        self.backend().await?.get_company(user_id, company_id).await
    }

    /// Replace a company of the logged-in user
    ///
    /// # Errors
    /// Returns [`StorageError::NoActiveSession`] if nobody is logged in
    pub async fn update_company(&self, company: &Company) -> StorageResult<()> {
        validate_company(company)?;
        let user_id = self.acting_user_id()?;
        self.backend().await?.update_company(&user_id, company).await
    }

    /// Delete a company and every application filed against it
    ///
    /// # Errors
    /// Returns an error if the delete fails; nothing is removed in that case
    pub async fn delete_company(
        &self,
        user_id: &str,
        company_id: &str,
    ) -> StorageResult<CascadeOutcome> {
        let outcome = self
            .backend()
            .await?
            .delete_company(user_id, company_id)
            .await?;
        tracing::debug!(
            user_id,
            company_id,
            company_deleted = outcome.company_deleted,
            applications_deleted = outcome.applications_deleted,
            "Cascading company delete"
        );
        Ok(outcome)
    }

    /// Companies whose name or location contains `query` (case-insensitive)
    ///
    /// # Errors
    /// Returns an error if the backend cannot be read
    pub async fn search_companies(&self, user_id: &str, query: &str) -> StorageResult<Vec<Company>> {
        let query = query.to_lowercase();
        let companies = self.companies(user_id).await?;
        Ok(companies
            .into_iter()
            .filter(|c| {
                c.name.to_lowercase().contains(&query) || c.location.to_lowercase().contains(&query)
            })
            .collect())
    }

    // --- Applications ---

    /// # Errors
    /// Returns an error if the application is invalid or the write fails
    pub async fn save_application(
        &self,
        user_id: &str,
        application: &Application,
    ) -> StorageResult<()> {
        validate_application(application)?;
        self.backend()
            .await?
            .put_application(user_id, application)
            .await
    }

    /// # Errors
    /// Returns an error if the backend cannot be read
    pub async fn applications(&self, user_id: &str) -> StorageResult<Vec<Application>> {
        self.backend().await?.list_applications(user_id).await
    }

    /// # Errors
    /// Returns an error if the backend cannot be read
    pub async fn application(
        &self,
        user_id: &str,
        application_id: &str,
    ) -> StorageResult<Option<Application>> {
        self.backend()
            .await?
            .get_application(user_id, application_id)
            .await
    }

    /// # Errors
    /// Returns an error if the backend cannot be read
    pub async fn applications_for_company(
        &self,
        user_id: &str,
        company_id: &str,
    ) -> StorageResult<Vec<Application>> {
        self.backend()
            .await?
            .list_applications_for_company(user_id, company_id)
            .await
    }

    /// Replace an application of the logged-in user
    ///
    /// # Errors
    /// Returns [`StorageError::NoActiveSession`] if nobody is logged in
    pub async fn update_application(&self, application: &Application) -> StorageResult<()> {
        validate_application(application)?;
        let user_id = self.acting_user_id()?;
        self.backend()
            .await?
            .update_application(&user_id, application)
            .await
    }

    /// # Errors
    /// Returns an error if the delete fails
    pub async fn delete_application(
        &self,
        user_id: &str,
        application_id: &str,
    ) -> StorageResult<bool> {
        self.backend()
            .await?
            .delete_application(user_id, application_id)
            .await
    }

    /// Change only the status of an application; false if it does not exist
    ///
    /// # Errors
    /// Returns an error if the write fails
    pub async fn update_application_status(
        &self,
        user_id: &str,
        application_id: &str,
        status: ApplicationStatus,
    ) -> StorageResult<bool> {
        self.backend()
            .await?
            .update_application_status(user_id, application_id, status)
            .await
    }

    /// Applications whose position or company name contains `query`
    ///
    /// # Errors
    /// Returns an error if the backend cannot be read
    pub async fn search_applications(
        &self,
        user_id: &str,
        query: &str,
    ) -> StorageResult<Vec<Application>> {
        let query = query.to_lowercase();
        let backend = self.backend().await?;
        let companies = backend.list_companies(user_id).await?;
        let applications = backend.list_applications(user_id).await?;

        Ok(applications
            .into_iter()
            .filter(|a| {
                a.position.to_lowercase().contains(&query)
                    || companies
                        .iter()
                        .find(|c| c.id == a.company_id)
                        .is_some_and(|c| c.name.to_lowercase().contains(&query))
            })
            .collect())
    }

    /// Applications whose company no longer exists
    ///
    /// # Errors
    /// Returns an error if the backend cannot be read
    pub async fn orphaned_applications(&self, user_id: &str) -> StorageResult<Vec<Application>> {
        let backend = self.backend().await?;
        let companies = backend.list_companies(user_id).await?;
        let applications = backend.list_applications(user_id).await?;

        Ok(applications
            .into_iter()
            .filter(|a| !companies.iter().any(|c| c.id == a.company_id))
            .collect())
    }

    /// Number of applications per status (statuses with none are omitted)
    ///
    /// # Errors
    /// Returns an error if the backend cannot be read
    pub async fn status_counts(
        &self,
        user_id: &str,
    ) -> StorageResult<BTreeMap<ApplicationStatus, usize>> {
        let mut counts = BTreeMap::new();
        for application in self.applications(user_id).await? {
            *counts.entry(application.status).or_insert(0) += 1;
        }
        Ok(counts)
    }

    // --- Export / import ---

    /// Everything the user owns, or `None` if the user id is unknown
    ///
    /// # Errors
    /// Returns an error if the backend cannot be read
    pub async fn export_user_data(&self, user_id: &str) -> StorageResult<Option<UserData>> {
        self.backend().await?.export_user_data(user_id).await
    }

    /// Export as a backup document
    ///
    /// # Errors
    /// Returns [`StorageError::NothingToExport`] if the user id is unknown
    pub async fn export_user_data_json(&self, user_id: &str) -> StorageResult<String> {
        let data = self
            .export_user_data(user_id)
            .await?
            .ok_or_else(|| StorageError::NothingToExport(user_id.to_string()))?;
        to_backup_json(&data)
    }

    /// Replace the user's companies and applications with a backup's
    ///
    /// The result matches the backup exactly (not a merge). The user record
    /// itself is left alone. Invalid input changes nothing.
    ///
    /// # Errors
    /// Returns [`StorageError::Validation`] if the backup is malformed
    pub async fn import_user_data(&self, user_id: &str, json: &str) -> StorageResult<ImportPreview> {
        let backup = parse_backup(json)?;
        let preview = backup.preview();

        self.backend()
            .await?
            .replace_user_data(user_id, &backup.companies, &backup.applications)
            .await?;

        tracing::info!(
            user_id,
            companies = preview.company_count,
            applications = preview.application_count,
            "Imported user data"
        );
        Ok(preview)
    }

    /// Wipe every collection (tests and reset only)
    ///
    /// # Errors
    /// Returns an error if the wipe fails
    pub async fn clear_all(&self) -> StorageResult<()> {
        self.backend().await?.clear_all().await
    }
}

fn select_backend(config: &StorageConfig) -> StorageResult<Box<dyn StorageBackend>> {
    match config.backend {
        BackendPreference::Auto => match SqliteBackend::open(&config.database_path()) {
            Ok(backend) => {
                tracing::info!(path = %config.database_path().display(), "Using SQLite storage");
                return Ok(Box::new(backend));
            }
            Err(e) => {
                tracing::warn!("SQLite initialization failed, falling back to flat storage: {e}");
            }
        },
        BackendPreference::Flat => {
            tracing::info!("Indexed storage disabled by configuration");
        }
    }

    let store = FileKeyValueStore::open(&config.flat_dir())?;
    tracing::info!(path = %store.root().display(), "Using flat storage");
    Ok(Box::new(FlatBackend::new(
        Box::new(store),
        config.flat_quota_bytes,
    )))
}
