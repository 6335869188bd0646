//! Record model: users, companies, applications and the export bundle

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A registered user, as exposed outside the storage layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Stable identifier, used as the ownership key
    pub id: String,
    /// Login key, unique across users
    pub email: String,
    /// Display name
    pub name: String,
    /// When the account was created
    pub created_at: DateTime<Utc>,
    /// When the user last logged in
    pub last_login: DateTime<Utc>,
}

impl User {
    /// Create a new user with a fresh id
    #[must_use]
    pub fn new(email: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            email,
            name,
            created_at: now,
            last_login: now,
        }
    }
}

/// A user record together with its credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUser {
    #[serde(flatten)]
    pub user: User,
    /// Opaque credential string (a PHC hash, see [`crate::credential`])
    pub password: String,
}

impl StoredUser {
    #[must_use]
    pub fn new(user: User, password: String) -> Self {
        Self { user, password }
    }

    /// Drop the credential
    #[must_use]
    pub fn into_user(self) -> User {
        self.user
    }
}

/// Company category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompanyType {
    Startup,
    Product,
    Service,
    Consulting,
    Consultancy,
    #[serde(rename = "FAANG")]
    Faang,
    Other,
}

impl CompanyType {
    fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "Startup",
            Self::Product => "Product",
            Self::Service => "Service",
            Self::Consulting => "Consulting",
            Self::Consultancy => "Consultancy",
            Self::Faang => "FAANG",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for CompanyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompanyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "startup" => Ok(Self::Startup),
            "product" => Ok(Self::Product),
            "service" => Ok(Self::Service),
            "consulting" => Ok(Self::Consulting),
            "consultancy" => Ok(Self::Consultancy),
            "faang" => Ok(Self::Faang),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown company type: {s}")),
        }
    }
}

/// Free-form label/value pair attached to a company
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub label: String,
    pub value: String,
}

/// A company the user is tracking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    /// Unique identifier
    pub id: String,
    /// Company name
    pub name: String,
    /// Free-text description
    pub description: String,
    /// Employee-count bucket, e.g. "50-200"
    pub employee_range: String,
    /// Entry-level salary text
    pub fresher_salary: String,
    /// Location
    pub location: String,
    /// Company category
    #[serde(rename = "type")]
    pub company_type: CompanyType,
    /// Culture rating, 1 to 5
    pub culture_rating: u8,
    /// External link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// Ordered custom fields
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
}

/// Where an application currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Applied,
    Screening,
    Interviewing,
    Technical,
    #[serde(rename = "HR")]
    Hr,
    Offer,
    Rejected,
    Ghosted,
}

impl ApplicationStatus {
    /// Every status, in pipeline order
    pub const ALL: [Self; 8] = [
        Self::Applied,
        Self::Screening,
        Self::Interviewing,
        Self::Technical,
        Self::Hr,
        Self::Offer,
        Self::Rejected,
        Self::Ghosted,
    ];

    /// Wire name, also used as the indexed column value
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "Applied",
            Self::Screening => "Screening",
            Self::Interviewing => "Interviewing",
            Self::Technical => "Technical",
            Self::Hr => "HR",
            Self::Offer => "Offer",
            Self::Rejected => "Rejected",
            Self::Ghosted => "Ghosted",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown application status: {s}"))
    }
}

/// Employment type of the position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmploymentType {
    #[default]
    #[serde(rename = "full time")]
    FullTime,
    #[serde(rename = "part time")]
    PartTime,
    Internship,
    Contract,
}

impl EmploymentType {
    fn as_str(self) -> &'static str {
        match self {
            Self::FullTime => "full time",
            Self::PartTime => "part time",
            Self::Internship => "internship",
            Self::Contract => "contract",
        }
    }
}

impl fmt::Display for EmploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmploymentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], " ").as_str() {
            "full time" => Ok(Self::FullTime),
            "part time" => Ok(Self::PartTime),
            "internship" => Ok(Self::Internship),
            "contract" => Ok(Self::Contract),
            _ => Err(format!("Unknown employment type: {s}")),
        }
    }
}

/// Role category of the position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleCategory {
    #[serde(rename = "AI/ML")]
    AiMl,
    #[serde(rename = "ML")]
    Ml,
    Data,
    Frontend,
    Backend,
    System,
    #[default]
    Software,
    Devops,
    #[serde(rename = "AI Engineer")]
    AiEngineer,
}

impl RoleCategory {
    const ALL: [Self; 9] = [
        Self::AiMl,
        Self::Ml,
        Self::Data,
        Self::Frontend,
        Self::Backend,
        Self::System,
        Self::Software,
        Self::Devops,
        Self::AiEngineer,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::AiMl => "AI/ML",
            Self::Ml => "ML",
            Self::Data => "Data",
            Self::Frontend => "Frontend",
            Self::Backend => "Backend",
            Self::System => "System",
            Self::Software => "Software",
            Self::Devops => "Devops",
            Self::AiEngineer => "AI Engineer",
        }
    }
}

impl fmt::Display for RoleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown role category: {s}"))
    }
}

/// A job application filed against a company
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    /// Unique identifier
    pub id: String,
    /// Company this application was filed with
    pub company_id: String,
    /// Position / role title
    pub position: String,
    /// Date the application was sent
    pub date_applied: NaiveDate,
    /// Current status
    pub status: ApplicationStatus,
    /// Employment type, full time when absent
    #[serde(rename = "type", default)]
    pub employment_type: EmploymentType,
    /// Role category, software when absent
    #[serde(default)]
    pub role: RoleCategory,
    /// Free-text notes
    #[serde(default)]
    pub notes: String,
    /// Expected salary text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_salary: Option<String>,
}

/// Everything one user owns; the unit of export and import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub user: User,
    pub companies: Vec<Company>,
    pub applications: Vec<Application>,
}

/// Generate an id for a new company or application
#[must_use]
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_string(&ApplicationStatus::Hr).unwrap(), "\"HR\"");
        assert_eq!(
            serde_json::from_str::<ApplicationStatus>("\"Ghosted\"").unwrap(),
            ApplicationStatus::Ghosted
        );
        assert_eq!("offer".parse::<ApplicationStatus>().unwrap(), ApplicationStatus::Offer);
        assert!("Hired".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn test_application_field_names_match_backup_format() {
        let json = r#"{
            "id": "a1",
            "companyId": "c1",
            "position": "Backend Engineer",
            "dateApplied": "2024-03-01",
            "status": "Applied",
            "type": "full time",
            "role": "AI Engineer",
            "notes": ""
        }"#;
        let app: Application = serde_json::from_str(json).unwrap();
        assert_eq!(app.company_id, "c1");
        assert_eq!(app.employment_type, EmploymentType::FullTime);
        assert_eq!(app.role, RoleCategory::AiEngineer);
        assert!(app.expected_salary.is_none());

        let value = serde_json::to_value(&app).unwrap();
        assert!(value.get("expectedSalary").is_none());
        assert_eq!(value["dateApplied"], "2024-03-01");
    }

    #[test]
    fn test_company_type_accepts_faang() {
        let ty: CompanyType = serde_json::from_str("\"FAANG\"").unwrap();
        assert_eq!(ty, CompanyType::Faang);
        assert_eq!("faang".parse::<CompanyType>().unwrap(), CompanyType::Faang);
        assert_eq!(ty.to_string(), "FAANG");
    }

    #[test]
    fn test_stored_user_flattens_credential() {
        let user = User::new("ada@example.com".to_string(), "Ada".to_string());
        let stored = StoredUser::new(user.clone(), "secret-hash".to_string());
        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["email"], "ada@example.com");
        assert_eq!(value["password"], "secret-hash");
        assert!(value.get("lastLogin").is_some());
        assert_eq!(stored.into_user(), user);
    }

    #[test]
    fn test_employment_type_parsing() {
        assert_eq!("full-time".parse::<EmploymentType>().unwrap(), EmploymentType::FullTime);
        assert_eq!("Contract".parse::<EmploymentType>().unwrap(), EmploymentType::Contract);
        assert!("gig".parse::<EmploymentType>().is_err());
    }
}
