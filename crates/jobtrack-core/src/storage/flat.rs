//! Flat backend: one JSON blob per user in a key-value store
//!
//! Layout:
//! - `jobtrack.users`: map of email to [`StoredUser`]
//! - `jobtrack.user_data.<user id>`: that user's companies and applications
//!
//! Every mutation reads the blob, computes the complete new state in memory
//! and commits it with a single `set`. The write is the atomic boundary, so a
//! cascading delete can never leave half its work behind.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::backend::{BackendKind, CascadeOutcome, StorageBackend, StorageInfo};
use super::kv::KeyValueStore;
use crate::error::{StorageError, StorageResult};
use crate::model::{Application, ApplicationStatus, Company, StoredUser, User, UserData};

const KEY_PREFIX: &str = "jobtrack.";
const USERS_KEY: &str = "jobtrack.users";

/// Default quota, the usual per-origin browser key-value allowance
pub const DEFAULT_FLAT_QUOTA: u64 = 5 * 1024 * 1024;

/// Per-user blob. Shaped like [`UserData`]; `user` is a snapshot of the
/// registry entry at the last write and is absent for unregistered owners.
#[derive(Debug, Default, Serialize, Deserialize)]
struct UserBlob {
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    companies: Vec<Company>,
    #[serde(default)]
    applications: Vec<Application>,
}

type UserRegistry = BTreeMap<String, StoredUser>;

/// Storage backend over any [`KeyValueStore`]
pub struct FlatBackend {
    store: Box<dyn KeyValueStore>,
    quota: u64,
    write_lock: Mutex<()>,
}

impl FlatBackend {
    /// Wrap a key-value store, bounding it to `quota` bytes
    #[must_use]
    pub fn new(store: Box<dyn KeyValueStore>, quota: u64) -> Self {
        Self {
            store,
            quota,
            write_lock: Mutex::new(()),
        }
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn data_key(user_id: &str) -> String {
        format!("{KEY_PREFIX}user_data.{user_id}")
    }

    fn write(&self, key: &str, value: &str) -> StorageResult<()> {
        let used = self.store.used_bytes()?;
        let previous = self
            .store
            .get(key)?
            .map_or(0, |old| (key.len() + old.len()) as u64);
        let needed = used.saturating_sub(previous) + (key.len() + value.len()) as u64;

        if needed > self.quota {
            return Err(StorageError::QuotaExceeded {
                needed,
                quota: self.quota,
            });
        }

        self.store.set(key, value)?;
        Ok(())
    }

    fn read_users(&self) -> StorageResult<UserRegistry> {
        match self.store.get(USERS_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(UserRegistry::new()),
        }
    }

    fn write_users(&self, users: &UserRegistry) -> StorageResult<()> {
        self.write(USERS_KEY, &serde_json::to_string(users)?)
    }

    fn find_user_by_id(users: &UserRegistry, user_id: &str) -> Option<StoredUser> {
        users.values().find(|stored| stored.user.id == user_id).cloned()
    }

    fn read_blob(&self, user_id: &str) -> StorageResult<UserBlob> {
        match self.store.get(&Self::data_key(user_id))? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(UserBlob::default()),
        }
    }

    fn write_blob(&self, user_id: &str, mut blob: UserBlob) -> StorageResult<()> {
        blob.user = Self::find_user_by_id(&self.read_users()?, user_id).map(StoredUser::into_user);
        self.write(&Self::data_key(user_id), &serde_json::to_string(&blob)?)
    }

    fn upsert<T, F>(records: &mut Vec<T>, record: &T, same_id: F)
    where
        T: Clone,
        F: Fn(&T) -> bool,
    {
        match records.iter_mut().find(|existing| same_id(existing)) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
    }
}

#[async_trait]
impl StorageBackend for FlatBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Flat
    }

    fn info(&self) -> StorageInfo {
        #[allow(clippy::cast_precision_loss)]
        let estimated_size = match self.store.used_bytes() {
            Ok(used) => {
                let percentage = used as f64 / self.quota as f64 * 100.0;
                format!(
                    "{used} bytes used ({percentage:.2}% of ~{:.1}MB)",
                    self.quota as f64 / (1024.0 * 1024.0)
                )
            }
            Err(_) => "unknown".to_string(),
        };

        StorageInfo {
            backend: BackendKind::Flat,
            estimated_size,
            features: vec![
                "Synchronous operations".to_string(),
                "Simple API".to_string(),
                "Single-write commits".to_string(),
                "Works without an embedded database".to_string(),
            ],
        }
    }

    async fn put_user(&self, user: &StoredUser) -> StorageResult<()> {
        let _guard = self.guard();
        let mut users = self.read_users()?;

        let id_taken = users
            .values()
            .any(|stored| stored.user.id == user.user.id && stored.user.email != user.user.email);
        if id_taken {
            return Err(StorageError::DuplicateUserId(user.user.id.clone()));
        }

        users.insert(user.user.email.clone(), user.clone());
        self.write_users(&users)
    }

    async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<StoredUser>> {
        Ok(self.read_users()?.remove(email))
    }

    async fn get_user_by_id(&self, user_id: &str) -> StorageResult<Option<User>> {
        Ok(Self::find_user_by_id(&self.read_users()?, user_id).map(StoredUser::into_user))
    }

    async fn user_exists(&self, email: &str) -> StorageResult<bool> {
        Ok(self.read_users()?.contains_key(email))
    }

    async fn touch_last_login(&self, user_id: &str, at: DateTime<Utc>) -> StorageResult<bool> {
        let _guard = self.guard();
        let mut users = self.read_users()?;

        let Some(stored) = users.values_mut().find(|stored| stored.user.id == user_id) else {
            return Ok(false);
        };
        stored.user.last_login = at;
        self.write_users(&users)?;
        Ok(true)
    }

    async fn put_company(&self, owner_id: &str, company: &Company) -> StorageResult<()> {
        let _guard = self.guard();
        let mut blob = self.read_blob(owner_id)?;
        Self::upsert(&mut blob.companies, company, |c| c.id == company.id);
        self.write_blob(owner_id, blob)
    }

    async fn get_company(
        &self,
        owner_id: &str,
        company_id: &str,
    ) -> StorageResult<Option<Company>> {
        let blob = self.read_blob(owner_id)?;
        Ok(blob.companies.into_iter().find(|c| c.id == company_id))
    }

    async fn list_companies(&self, owner_id: &str) -> StorageResult<Vec<Company>> {
        Ok(self.read_blob(owner_id)?.companies)
    }

    async fn delete_company(
        &self,
        owner_id: &str,
        company_id: &str,
    ) -> StorageResult<CascadeOutcome> {
        let _guard = self.guard();
        let mut blob = self.read_blob(owner_id)?;

        let companies_before = blob.companies.len();
        blob.companies.retain(|c| c.id != company_id);
        let applications_before = blob.applications.len();
        blob.applications.retain(|a| a.company_id != company_id);

        let outcome = CascadeOutcome {
            company_deleted: blob.companies.len() < companies_before,
            applications_deleted: applications_before - blob.applications.len(),
        };
        if outcome != CascadeOutcome::default() {
            self.write_blob(owner_id, blob)?;
        }
        Ok(outcome)
    }

    async fn put_application(
        &self,
        owner_id: &str,
        application: &Application,
    ) -> StorageResult<()> {
        let _guard = self.guard();
        let mut blob = self.read_blob(owner_id)?;
        Self::upsert(&mut blob.applications, application, |a| {
            a.id == application.id
        });
        self.write_blob(owner_id, blob)
    }

    async fn get_application(
        &self,
        owner_id: &str,
        application_id: &str,
    ) -> StorageResult<Option<Application>> {
        let blob = self.read_blob(owner_id)?;
        Ok(blob.applications.into_iter().find(|a| a.id == application_id))
    }

    async fn list_applications(&self, owner_id: &str) -> StorageResult<Vec<Application>> {
        Ok(self.read_blob(owner_id)?.applications)
    }

    async fn list_applications_for_company(
        &self,
        owner_id: &str,
        company_id: &str,
    ) -> StorageResult<Vec<Application>> {
        let blob = self.read_blob(owner_id)?;
        Ok(blob
            .applications
            .into_iter()
            .filter(|a| a.company_id == company_id)
            .collect())
    }

    async fn delete_application(
        &self,
        owner_id: &str,
        application_id: &str,
    ) -> StorageResult<bool> {
        let _guard = self.guard();
        let mut blob = self.read_blob(owner_id)?;

        let before = blob.applications.len();
        blob.applications.retain(|a| a.id != application_id);
        if blob.applications.len() == before {
            return Ok(false);
        }
        self.write_blob(owner_id, blob)?;
        Ok(true)
    }

    async fn update_application_status(
        &self,
        owner_id: &str,
        application_id: &str,
        status: ApplicationStatus,
    ) -> StorageResult<bool> {
        let _guard = self.guard();
        let mut blob = self.read_blob(owner_id)?;

        let Some(application) = blob.applications.iter_mut().find(|a| a.id == application_id)
        else {
            return Ok(false);
        };
        application.status = status;
        self.write_blob(owner_id, blob)?;
        Ok(true)
    }

    async fn export_user_data(&self, user_id: &str) -> StorageResult<Option<UserData>> {
        let Some(stored) = Self::find_user_by_id(&self.read_users()?, user_id) else {
            return Ok(None);
        };
        let blob = self.read_blob(user_id)?;

        Ok(Some(UserData {
            user: stored.into_user(),
            companies: blob.companies,
            applications: blob.applications,
        }))
    }

    async fn replace_user_data(
        &self,
        owner_id: &str,
        companies: &[Company],
        applications: &[Application],
    ) -> StorageResult<()> {
        let _guard = self.guard();
        let blob = UserBlob {
            user: None,
            companies: companies.to_vec(),
            applications: applications.to_vec(),
        };
        self.write_blob(owner_id, blob)?;

        tracing::debug!(
            owner_id,
            companies = companies.len(),
            applications = applications.len(),
            "Overwrote user blob"
        );
        Ok(())
    }

    async fn clear_all(&self) -> StorageResult<()> {
        let _guard = self.guard();
        for key in self.store.keys()? {
            if key.starts_with(KEY_PREFIX) {
                self.store.remove(&key)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::kv::MemoryKeyValueStore;

    #[test]
    fn test_data_key_is_namespaced() {
        assert_eq!(FlatBackend::data_key("u1"), "jobtrack.user_data.u1");
    }

    #[test]
    fn test_write_rejects_values_over_quota() {
        let backend = FlatBackend::new(Box::new(MemoryKeyValueStore::new()), 32);
        backend.write("k", "small").unwrap();

        let err = backend.write("k", &"x".repeat(64)).unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { quota: 32, .. }));
        assert_eq!(backend.store.get("k").unwrap().as_deref(), Some("small"));
    }

    #[test]
    fn test_overwrite_only_counts_new_value() {
        let backend = FlatBackend::new(Box::new(MemoryKeyValueStore::new()), 20);
        backend.write("k", &"a".repeat(15)).unwrap();
        // 1 + 15 bytes are replaced, not added
        backend.write("k", &"b".repeat(19)).unwrap();
    }
}
