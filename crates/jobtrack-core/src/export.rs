//! Backup document format
//!
//! A backup is a JSON object with exactly three top-level fields:
//! `user` (object, no credential), `companies` and `applications`
//! (arrays). Applications saved before `type` and `role` existed import
//! as full time / Software.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{StorageError, StorageResult};
use crate::model::{Application, Company, UserData};
use crate::validation::validate_collections;

/// Records carried by a backup, after validation
#[derive(Debug, Clone)]
pub struct ParsedBackup {
    /// The `user` object as written in the file; informational only
    pub user: Map<String, Value>,
    pub companies: Vec<Company>,
    pub applications: Vec<Application>,
}

#[derive(Deserialize)]
struct BackupDocument {
    companies: Vec<Company>,
    applications: Vec<Application>,
}

/// Summary shown before or after an import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportPreview {
    /// Email recorded in the backup, if any
    pub email: Option<String>,
    pub company_count: usize,
    pub application_count: usize,
    /// Applications whose company is not part of the backup
    pub orphaned_count: usize,
}

impl ParsedBackup {
    #[must_use]
    pub fn preview(&self) -> ImportPreview {
        let orphaned_count = self
            .applications
            .iter()
            .filter(|a| !self.companies.iter().any(|c| c.id == a.company_id))
            .count();

        ImportPreview {
            email: self
                .user
                .get("email")
                .and_then(Value::as_str)
                .map(str::to_string),
            company_count: self.companies.len(),
            application_count: self.applications.len(),
            orphaned_count,
        }
    }
}

fn invalid(message: impl Into<String>) -> StorageError {
    StorageError::Validation(message.into())
}

/// Parse and validate a backup document
///
/// # Errors
/// Returns [`StorageError::Validation`] if the text is not JSON, lacks one of
/// the three required fields, or contains a malformed record
pub fn parse_backup(json: &str) -> StorageResult<ParsedBackup> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| invalid(format!("backup is not valid JSON: {e}")))?;
    let Value::Object(mut root) = value else {
        return Err(invalid("backup must be a JSON object"));
    };

    let user = match root.remove("user") {
        Some(Value::Object(user)) => user,
        Some(_) => return Err(invalid("'user' must be an object")),
        None => return Err(invalid("backup has no 'user' object")),
    };
    for field in ["companies", "applications"] {
        match root.get(field) {
            Some(Value::Array(_)) => {}
            Some(_) => return Err(invalid(format!("'{field}' must be an array"))),
            None => return Err(invalid(format!("backup has no '{field}' array"))),
        }
    }

    let document: BackupDocument = serde_json::from_value(Value::Object(root))
        .map_err(|e| invalid(format!("backup contains an invalid record: {e}")))?;
    validate_collections(&document.companies, &document.applications)?;

    Ok(ParsedBackup {
        user,
        companies: document.companies,
        applications: document.applications,
    })
}

/// Render a backup document (pretty-printed, human-readable)
///
/// # Errors
/// Returns an error if serialization fails
pub fn to_backup_json(data: &UserData) -> StorageResult<String> {
    Ok(serde_json::to_string_pretty(data)?)
}

/// Default file name for a backup taken on `date`
#[must_use]
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("jobtrack-backup-{}.json", date.format("%Y-%m-%d"))
}
