//! Field checks applied before any write

use std::collections::HashSet;

use crate::error::{StorageError, StorageResult};
use crate::model::{Application, Company};

pub const MIN_CULTURE_RATING: u8 = 1;
pub const MAX_CULTURE_RATING: u8 = 5;

/// Longest accepted user id, in bytes. The flat store derives file names from it.
pub const MAX_USER_ID_LEN: usize = 64;

/// # Errors
/// Returns [`StorageError::Validation`] if the id is empty or too long
pub fn validate_user_id(user_id: &str) -> StorageResult<()> {
    if user_id.trim().is_empty() {
        return Err(StorageError::Validation("user id cannot be empty".to_string()));
    }
    if user_id.len() > MAX_USER_ID_LEN {
        return Err(StorageError::Validation(format!(
            "user id is {} bytes, at most {MAX_USER_ID_LEN} allowed",
            user_id.len()
        )));
    }
    Ok(())
}

/// # Errors
/// Returns [`StorageError::Validation`] if the company is malformed
pub fn validate_company(company: &Company) -> StorageResult<()> {
    if company.id.trim().is_empty() {
        return Err(StorageError::Validation("company id cannot be empty".to_string()));
    }
    if company.name.trim().is_empty() {
        return Err(StorageError::Validation(format!(
            "company '{}' has an empty name",
            company.id
        )));
    }
    if !(MIN_CULTURE_RATING..=MAX_CULTURE_RATING).contains(&company.culture_rating) {
        return Err(StorageError::Validation(format!(
            "company '{}' has culture rating {}, expected {MIN_CULTURE_RATING}-{MAX_CULTURE_RATING}",
            company.id, company.culture_rating
        )));
    }
    Ok(())
}

/// # Errors
/// Returns [`StorageError::Validation`] if the application is malformed
pub fn validate_application(application: &Application) -> StorageResult<()> {
    if application.id.trim().is_empty() {
        return Err(StorageError::Validation(
            "application id cannot be empty".to_string(),
        ));
    }
    if application.company_id.trim().is_empty() {
        return Err(StorageError::Validation(format!(
            "application '{}' has no company",
            application.id
        )));
    }
    Ok(())
}

/// Validate a whole collection, including id uniqueness
///
/// # Errors
/// Returns [`StorageError::Validation`] on the first problem found
pub fn validate_collections(
    companies: &[Company],
    applications: &[Application],
) -> StorageResult<()> {
    let mut seen = HashSet::new();
    for company in companies {
        validate_company(company)?;
        if !seen.insert(company.id.as_str()) {
            return Err(StorageError::Validation(format!(
                "duplicate company id '{}'",
                company.id
            )));
        }
    }

    let mut seen = HashSet::new();
    for application in applications {
        validate_application(application)?;
        if !seen.insert(application.id.as_str()) {
            return Err(StorageError::Validation(format!(
                "duplicate application id '{}'",
                application.id
            )));
        }
    }
    Ok(())
}
