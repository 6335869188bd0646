//! The contract both storage backends implement

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::error::StorageResult;
use crate::model::{Application, ApplicationStatus, Company, StoredUser, User, UserData};

/// Which engine is serving requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Transactional SQLite database with secondary indexes
    Indexed,
    /// Whole-blob key-value fallback
    Flat,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Indexed => write!(f, "SQLite"),
            Self::Flat => write!(f, "Flat file"),
        }
    }
}

/// Read-only capability report, for display only
#[derive(Debug, Clone, Serialize)]
pub struct StorageInfo {
    /// Active backend
    pub backend: BackendKind,
    /// Human-readable capacity estimate
    pub estimated_size: String,
    /// Feature tags
    pub features: Vec<String>,
}

/// Result of deleting a company together with its applications
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeOutcome {
    /// Whether the company record existed and was removed
    pub company_deleted: bool,
    /// How many applications referencing it were removed
    pub applications_deleted: usize,
}

/// Storage engine behind the [`Storage`](crate::Storage) facade.
///
/// Every company/application call is scoped to `owner_id`: a backend must
/// never return or modify a record owned by someone else. Absence is
/// reported through `Option`, `bool` or an empty `Vec`, never as an error.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Which engine this is
    fn kind(&self) -> BackendKind;

    /// Capacity and feature summary
    fn info(&self) -> StorageInfo;

    /// Insert or replace a user, keyed by email.
    ///
    /// Callers check [`user_exists`](Self::user_exists) first; the only
    /// conflict raised here is a user id already used under another email.
    async fn put_user(&self, user: &StoredUser) -> StorageResult<()>;

    async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<StoredUser>>;

    /// Lookup by id; the credential is stripped.
    async fn get_user_by_id(&self, user_id: &str) -> StorageResult<Option<User>>;

    async fn user_exists(&self, email: &str) -> StorageResult<bool>;

    /// Set `last_login`; returns false when no user has this id.
    async fn touch_last_login(&self, user_id: &str, at: DateTime<Utc>) -> StorageResult<bool>;

    /// Insert or replace a company owned by `owner_id`.
    async fn put_company(&self, owner_id: &str, company: &Company) -> StorageResult<()>;

    async fn get_company(
        &self,
        owner_id: &str,
        company_id: &str,
    ) -> StorageResult<Option<Company>>;

    /// All companies of one owner, in unspecified order.
    async fn list_companies(&self, owner_id: &str) -> StorageResult<Vec<Company>>;

    /// Full-record replace by id within the owner's records.
    async fn update_company(&self, owner_id: &str, company: &Company) -> StorageResult<()> {
        self.put_company(owner_id, company).await
    }

    /// Remove a company and every application of the same owner that
    /// references it, as one atomic unit.
    async fn delete_company(
        &self,
        owner_id: &str,
        company_id: &str,
    ) -> StorageResult<CascadeOutcome>;

    /// Insert or replace an application owned by `owner_id`.
    async fn put_application(
        &self,
        owner_id: &str,
        application: &Application,
    ) -> StorageResult<()>;

    async fn get_application(
        &self,
        owner_id: &str,
        application_id: &str,
    ) -> StorageResult<Option<Application>>;

    /// All applications of one owner, in unspecified order.
    async fn list_applications(&self, owner_id: &str) -> StorageResult<Vec<Application>>;

    async fn list_applications_for_company(
        &self,
        owner_id: &str,
        company_id: &str,
    ) -> StorageResult<Vec<Application>>;

    async fn update_application(
        &self,
        owner_id: &str,
        application: &Application,
    ) -> StorageResult<()> {
        self.put_application(owner_id, application).await
    }

    async fn delete_application(
        &self,
        owner_id: &str,
        application_id: &str,
    ) -> StorageResult<bool>;

    /// Change only the status; returns false when the application is absent.
    async fn update_application_status(
        &self,
        owner_id: &str,
        application_id: &str,
        status: ApplicationStatus,
    ) -> StorageResult<bool>;

    /// The user (without credential) plus everything they own, or `None`
    /// when no user has this id.
    async fn export_user_data(&self, user_id: &str) -> StorageResult<Option<UserData>>;

    /// Make the owner's companies and applications exactly the given sets.
    /// Either every record is written or nothing changes.
    async fn replace_user_data(
        &self,
        owner_id: &str,
        companies: &[Company],
        applications: &[Application],
    ) -> StorageResult<()>;

    /// Wipe every collection (tests and reset only).
    async fn clear_all(&self) -> StorageResult<()>;
}
