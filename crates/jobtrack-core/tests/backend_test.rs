//! Backend contract tests
//!
//! Every test runs against both the SQLite and the flat backend; callers
//! must not be able to tell them apart.

use chrono::{NaiveDate, TimeZone, Utc};
use jobtrack_core::model::{
    Application, ApplicationStatus, Company, CompanyType, CustomField, EmploymentType,
    RoleCategory, StoredUser, User,
};
use jobtrack_core::storage::{
    FlatBackend, MemoryKeyValueStore, SqliteBackend, StorageBackend, DEFAULT_FLAT_QUOTA,
};
use jobtrack_core::StorageError;

fn backends() -> Vec<Box<dyn StorageBackend>> {
    vec![
        Box::new(SqliteBackend::in_memory().expect("Failed to create database")),
        Box::new(FlatBackend::new(
            Box::new(MemoryKeyValueStore::new()),
            DEFAULT_FLAT_QUOTA,
        )),
    ]
}

fn stored_user(id: &str, email: &str) -> StoredUser {
    let mut user = User::new(email.to_string(), "Test User".to_string());
    user.id = id.to_string();
    StoredUser::new(user, "$argon2id$placeholder".to_string())
}

fn company(id: &str, name: &str) -> Company {
    Company {
        id: id.to_string(),
        name: name.to_string(),
        description: "Builds things".to_string(),
        employee_range: "50-200".to_string(),
        fresher_salary: "8 LPA".to_string(),
        location: "Berlin".to_string(),
        company_type: CompanyType::Product,
        culture_rating: 4,
        website: Some("https://example.com".to_string()),
        custom_fields: vec![CustomField {
            label: "Stack".to_string(),
            value: "Rust".to_string(),
        }],
    }
}

fn application(id: &str, company_id: &str) -> Application {
    Application {
        id: id.to_string(),
        company_id: company_id.to_string(),
        position: "Backend Engineer".to_string(),
        date_applied: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        status: ApplicationStatus::Applied,
        employment_type: EmploymentType::FullTime,
        role: RoleCategory::Backend,
        notes: String::new(),
        expected_salary: None,
    }
}

#[tokio::test]
async fn test_user_round_trip() {
    for backend in backends() {
        let kind = backend.kind();
        let user = stored_user("u1", "ada@example.com");

        assert!(!backend.user_exists("ada@example.com").await.unwrap());
        backend.put_user(&user).await.unwrap();

        assert!(backend.user_exists("ada@example.com").await.unwrap(), "{kind}");
        let fetched = backend.get_user_by_email("ada@example.com").await.unwrap();
        assert_eq!(fetched, Some(user.clone()), "{kind}");

        let by_id = backend.get_user_by_id("u1").await.unwrap();
        assert_eq!(by_id, Some(user.user.clone()), "{kind}");
        assert!(backend.get_user_by_id("nobody").await.unwrap().is_none());
    }
}

#[tokio::test]
async fn test_put_user_replaces_by_email() {
    for backend in backends() {
        let mut user = stored_user("u1", "ada@example.com");
        backend.put_user(&user).await.unwrap();

        user.user.name = "Ada L.".to_string();
        backend.put_user(&user).await.unwrap();

        let fetched = backend
            .get_user_by_email("ada@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.user.name, "Ada L.", "{}", backend.kind());
    }
}

#[tokio::test]
async fn test_user_id_collision_is_rejected() {
    for backend in backends() {
        backend
            .put_user(&stored_user("u1", "ada@example.com"))
            .await
            .unwrap();

        let err = backend
            .put_user(&stored_user("u1", "grace@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::DuplicateUserId(ref id) if id == "u1"));
        assert!(!backend.user_exists("grace@example.com").await.unwrap());
    }
}

#[tokio::test]
async fn test_touch_last_login() {
    for backend in backends() {
        backend
            .put_user(&stored_user("u1", "ada@example.com"))
            .await
            .unwrap();
        let at = Utc.with_ymd_and_hms(2030, 1, 1, 9, 0, 0).unwrap();

        assert!(backend.touch_last_login("u1", at).await.unwrap());
        assert!(!backend.touch_last_login("ghost", at).await.unwrap());

        let user = backend.get_user_by_id("u1").await.unwrap().unwrap();
        assert_eq!(user.last_login, at, "{}", backend.kind());
    }
}

#[tokio::test]
async fn test_company_round_trip() {
    for backend in backends() {
        let acme = company("c1", "Acme");
        backend.put_company("u1", &acme).await.unwrap();

        let listed = backend.list_companies("u1").await.unwrap();
        assert_eq!(listed, vec![acme.clone()], "{}", backend.kind());
        assert_eq!(backend.get_company("u1", "c1").await.unwrap(), Some(acme));
        assert!(backend.get_company("u1", "c2").await.unwrap().is_none());
    }
}

#[tokio::test]
async fn test_upsert_is_idempotent() {
    for backend in backends() {
        let acme = company("c1", "Acme");
        let app = application("a1", "c1");

        for _ in 0..3 {
            backend.put_company("u1", &acme).await.unwrap();
            backend.put_application("u1", &app).await.unwrap();
        }

        assert_eq!(backend.list_companies("u1").await.unwrap().len(), 1);
        assert_eq!(backend.list_applications("u1").await.unwrap().len(), 1);
    }
}

#[tokio::test]
async fn test_update_replaces_whole_record() {
    for backend in backends() {
        let mut acme = company("c1", "Acme");
        backend.put_company("u1", &acme).await.unwrap();

        acme.name = "Acme Corp".to_string();
        acme.website = None;
        acme.custom_fields.clear();
        backend.update_company("u1", &acme).await.unwrap();

        let fetched = backend.get_company("u1", "c1").await.unwrap().unwrap();
        assert_eq!(fetched, acme, "{}", backend.kind());

        let mut app = application("a1", "c1");
        backend.put_application("u1", &app).await.unwrap();
        app.notes = "Referral from Bob".to_string();
        app.expected_salary = Some("120k".to_string());
        backend.update_application("u1", &app).await.unwrap();
        assert_eq!(
            backend.get_application("u1", "a1").await.unwrap(),
            Some(app)
        );
    }
}

#[tokio::test]
async fn test_owners_are_isolated() {
    for backend in backends() {
        let kind = backend.kind();
        backend.put_company("alice", &company("c1", "Acme")).await.unwrap();
        backend
            .put_application("alice", &application("a1", "c1"))
            .await
            .unwrap();

        assert!(backend.list_companies("bob").await.unwrap().is_empty(), "{kind}");
        assert!(backend.list_applications("bob").await.unwrap().is_empty());
        assert!(backend.get_company("bob", "c1").await.unwrap().is_none());
        assert!(backend.get_application("bob", "a1").await.unwrap().is_none());

        // Bob cannot delete or modify Alice's records
        let outcome = backend.delete_company("bob", "c1").await.unwrap();
        assert!(!outcome.company_deleted);
        assert!(!backend.delete_application("bob", "a1").await.unwrap());
        assert!(!backend
            .update_application_status("bob", "a1", ApplicationStatus::Offer)
            .await
            .unwrap());

        assert_eq!(backend.list_companies("alice").await.unwrap().len(), 1);
        let app = backend.get_application("alice", "a1").await.unwrap().unwrap();
        assert_eq!(app.status, ApplicationStatus::Applied, "{kind}");
    }
}

#[tokio::test]
async fn test_record_ids_are_scoped_per_owner() {
    for backend in backends() {
        let kind = backend.kind();
        backend.put_company("alice", &company("c1", "Acme")).await.unwrap();
        backend
            .put_application("alice", &application("a1", "c1"))
            .await
            .unwrap();

        // Bob reuses the same ids for his own records
        backend.put_company("bob", &company("c1", "Globex")).await.unwrap();
        let mut offer = application("a1", "c1");
        offer.status = ApplicationStatus::Offer;
        backend.update_application("bob", &offer).await.unwrap();

        let globex = backend.get_company("bob", "c1").await.unwrap().unwrap();
        assert_eq!(globex.name, "Globex", "{kind}");
        let acme = backend.get_company("alice", "c1").await.unwrap().unwrap();
        assert_eq!(acme.name, "Acme", "{kind}");
        let app = backend.get_application("alice", "a1").await.unwrap().unwrap();
        assert_eq!(app.status, ApplicationStatus::Applied, "{kind}");

        // Replacing Bob's data leaves Alice's same-id records alone
        backend
            .replace_user_data("bob", &[company("c1", "Initech")], &[application("a1", "c1")])
            .await
            .unwrap();
        assert_eq!(backend.list_companies("bob").await.unwrap().len(), 1, "{kind}");
        let acme = backend.get_company("alice", "c1").await.unwrap().unwrap();
        assert_eq!(acme.name, "Acme", "{kind}");

        let outcome = backend.delete_company("bob", "c1").await.unwrap();
        assert!(outcome.company_deleted, "{kind}");
        assert_eq!(outcome.applications_deleted, 1, "{kind}");
        assert_eq!(backend.list_companies("alice").await.unwrap().len(), 1, "{kind}");
        assert_eq!(backend.list_applications("alice").await.unwrap().len(), 1, "{kind}");
    }
}

#[tokio::test]
async fn test_delete_company_cascades() {
    for backend in backends() {
        let kind = backend.kind();
        backend.put_company("u1", &company("c1", "Acme")).await.unwrap();
        backend.put_company("u1", &company("c2", "Globex")).await.unwrap();
        backend.put_application("u1", &application("a1", "c1")).await.unwrap();
        backend.put_application("u1", &application("a2", "c1")).await.unwrap();
        backend.put_application("u1", &application("a3", "c2")).await.unwrap();

        let outcome = backend.delete_company("u1", "c1").await.unwrap();
        assert!(outcome.company_deleted, "{kind}");
        assert_eq!(outcome.applications_deleted, 2, "{kind}");

        let remaining: Vec<String> = backend
            .list_applications("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(remaining, vec!["a3".to_string()], "{kind}");
        assert!(backend
            .list_applications_for_company("u1", "c1")
            .await
            .unwrap()
            .is_empty());
    }
}

#[tokio::test]
async fn test_delete_missing_company_removes_dangling_applications() {
    for backend in backends() {
        backend
            .put_application("u1", &application("a1", "gone"))
            .await
            .unwrap();

        let outcome = backend.delete_company("u1", "gone").await.unwrap();
        assert!(!outcome.company_deleted);
        assert_eq!(outcome.applications_deleted, 1, "{}", backend.kind());
    }
}

#[tokio::test]
async fn test_applications_for_company() {
    for backend in backends() {
        backend.put_application("u1", &application("a1", "c1")).await.unwrap();
        backend.put_application("u1", &application("a2", "c2")).await.unwrap();
        backend.put_application("u1", &application("a3", "c1")).await.unwrap();

        let mut ids: Vec<String> = backend
            .list_applications_for_company("u1", "c1")
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a1", "a3"], "{}", backend.kind());
    }
}

#[tokio::test]
async fn test_update_application_status() {
    for backend in backends() {
        let app = application("a1", "c1");
        backend.put_application("u1", &app).await.unwrap();

        assert!(backend
            .update_application_status("u1", "a1", ApplicationStatus::Interviewing)
            .await
            .unwrap());
        assert!(!backend
            .update_application_status("u1", "missing", ApplicationStatus::Offer)
            .await
            .unwrap());

        let fetched = backend.get_application("u1", "a1").await.unwrap().unwrap();
        assert_eq!(fetched.status, ApplicationStatus::Interviewing);
        // Only the status changed
        assert_eq!(fetched.position, app.position);
        assert_eq!(fetched.date_applied, app.date_applied);
    }
}

#[tokio::test]
async fn test_delete_application() {
    for backend in backends() {
        backend.put_application("u1", &application("a1", "c1")).await.unwrap();

        assert!(backend.delete_application("u1", "a1").await.unwrap());
        assert!(!backend.delete_application("u1", "a1").await.unwrap());
        assert!(backend.list_applications("u1").await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_export_user_data() {
    for backend in backends() {
        let kind = backend.kind();
        let user = stored_user("u1", "ada@example.com");
        backend.put_user(&user).await.unwrap();
        backend.put_company("u1", &company("c1", "Acme")).await.unwrap();
        backend.put_application("u1", &application("a1", "c1")).await.unwrap();

        let data = backend.export_user_data("u1").await.unwrap().unwrap();
        assert_eq!(data.user, user.user, "{kind}");
        assert_eq!(data.companies.len(), 1);
        assert_eq!(data.applications.len(), 1);

        let json = serde_json::to_string(&data).unwrap();
        assert!(!json.contains("password"), "{kind}: credential leaked");

        assert!(backend.export_user_data("ghost").await.unwrap().is_none());
    }
}

#[tokio::test]
async fn test_replace_user_data_is_exact() {
    for backend in backends() {
        let kind = backend.kind();
        backend.put_company("u1", &company("old", "Old Co")).await.unwrap();
        backend.put_application("u1", &application("a-old", "old")).await.unwrap();
        backend.put_company("u2", &company("other", "Other Co")).await.unwrap();

        let companies = vec![company("c1", "Acme"), company("c2", "Globex")];
        let applications = vec![application("a1", "c1")];
        backend
            .replace_user_data("u1", &companies, &applications)
            .await
            .unwrap();

        assert_eq!(backend.list_companies("u1").await.unwrap(), companies, "{kind}");
        assert_eq!(backend.list_applications("u1").await.unwrap(), applications);
        // Other owners are untouched
        assert_eq!(backend.list_companies("u2").await.unwrap().len(), 1, "{kind}");
    }
}

#[tokio::test]
async fn test_clear_all() {
    for backend in backends() {
        backend.put_user(&stored_user("u1", "ada@example.com")).await.unwrap();
        backend.put_company("u1", &company("c1", "Acme")).await.unwrap();

        backend.clear_all().await.unwrap();

        assert!(!backend.user_exists("ada@example.com").await.unwrap());
        assert!(backend.list_companies("u1").await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_info_reports_backend() {
    for backend in backends() {
        let info = backend.info();
        assert_eq!(info.backend, backend.kind());
        assert!(!info.features.is_empty());
        assert!(!info.estimated_size.is_empty());
    }
}
