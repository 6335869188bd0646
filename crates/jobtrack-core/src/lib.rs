//! Jobtrack Core - persistence for the job-application tracker
//!
//! This crate provides the data model, the two storage backends
//! (SQLite and a flat key-value store), the [`Storage`] facade that
//! chooses between them, and the backup document format.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod credential;
pub mod error;
pub mod export;
pub mod facade;
pub mod model;
pub mod session;
pub mod storage;
pub mod validation;

pub use config::{BackendPreference, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use export::ImportPreview;
pub use facade::{Storage, StorageState};
pub use model::{
    Application, ApplicationStatus, Company, CompanyType, CustomField, EmploymentType,
    RoleCategory, StoredUser, User, UserData,
};
pub use session::{FileSession, MemorySession, SessionStore};
pub use storage::{BackendKind, CascadeOutcome, StorageInfo};
