//! Application CLI commands
//!
//! Handles: jobtrack app add/list/show/update/status/delete/search/orphans

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use clap::{Args, Subcommand};
use serde_json::json;
use std::collections::HashMap;

use jobtrack_core::model::{
    new_id, Application, ApplicationStatus, Company, EmploymentType, RoleCategory,
};
use jobtrack_core::Storage;

use super::{confirm, non_empty, require_user};

/// Application commands
#[derive(Subcommand)]
pub enum AppCommands {
    /// List your applications
    List {
        /// Only applications filed with this company
        #[arg(long)]
        company: Option<String>,
        /// Only applications with this status
        #[arg(long)]
        status: Option<ApplicationStatus>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a new application
    Add(AppAddArgs),
    /// Show one application
    Show {
        /// Application ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change fields of an application
    Update(AppUpdateArgs),
    /// Move an application to a new status
    Status {
        /// Application ID
        id: String,
        /// New status (Applied, Screening, Interviewing, Technical, HR, Offer, Rejected, Ghosted)
        status: ApplicationStatus,
    },
    /// Delete an application
    Delete {
        /// Application ID
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Find applications by position or company name
    Search {
        /// Text to look for (case-insensitive)
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List applications whose company no longer exists
    Orphans {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Arguments for `jobtrack app add`
#[derive(Args)]
pub struct AppAddArgs {
    /// Company ID the application was filed with
    #[arg(long)]
    pub company: String,

    /// Position / role title
    pub position: String,

    /// Date applied (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Initial status
    #[arg(long, default_value = "Applied")]
    pub status: ApplicationStatus,

    /// Employment type (full time, part time, internship, contract)
    #[arg(long = "type", value_name = "TYPE", default_value = "full time")]
    pub employment_type: EmploymentType,

    /// Role category (AI/ML, ML, Data, Frontend, Backend, System, Software, Devops, AI Engineer)
    #[arg(long, default_value = "Software")]
    pub role: RoleCategory,

    /// Notes
    #[arg(long, default_value = "")]
    pub notes: String,

    /// Expected salary
    #[arg(long)]
    pub salary: Option<String>,
}

/// Arguments for `jobtrack app update`
#[derive(Args)]
pub struct AppUpdateArgs {
    /// Application ID
    pub id: String,

    /// Move to another company
    #[arg(long)]
    pub company: Option<String>,

    /// New position
    #[arg(long)]
    pub position: Option<String>,

    /// New date applied (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// New status
    #[arg(long)]
    pub status: Option<ApplicationStatus>,

    /// New employment type
    #[arg(long = "type", value_name = "TYPE")]
    pub employment_type: Option<EmploymentType>,

    /// New role category
    #[arg(long)]
    pub role: Option<RoleCategory>,

    /// Replace notes
    #[arg(long)]
    pub notes: Option<String>,

    /// New expected salary (empty string clears it)
    #[arg(long)]
    pub salary: Option<String>,
}

impl AppUpdateArgs {
    fn apply(self, app: &mut Application) {
        if let Some(company) = self.company {
            app.company_id = company;
        }
        if let Some(position) = self.position {
            app.position = position;
        }
        if let Some(date) = self.date {
            app.date_applied = date;
        }
        if let Some(status) = self.status {
            app.status = status;
        }
        if let Some(employment_type) = self.employment_type {
            app.employment_type = employment_type;
        }
        if let Some(role) = self.role {
            app.role = role;
        }
        if let Some(notes) = self.notes {
            app.notes = notes;
        }
        if let Some(salary) = self.salary {
            app.expected_salary = (!salary.trim().is_empty()).then_some(salary);
        }
    }
}

/// Execute application command
pub async fn execute(storage: &Storage, cmd: AppCommands) -> anyhow::Result<()> {
    let user = require_user(storage).await?;

    match cmd {
        AppCommands::List {
            company,
            status,
            json,
        } => {
            let mut apps = match &company {
                Some(company_id) => {
                    storage
                        .applications_for_company(&user.id, company_id)
                        .await?
                }
                None => storage.applications(&user.id).await?,
            };
            if let Some(status) = status {
                apps.retain(|a| a.status == status);
            }
            let companies = storage.companies(&user.id).await?;
            print_applications(&apps, &companies, json)?;
        }
        AppCommands::Add(args) => {
            if storage.company(&user.id, &args.company).await?.is_none() {
                bail!("Company not found: {}", args.company);
            }
            let app = Application {
                id: new_id(),
                company_id: args.company,
                position: non_empty("Position", &args.position)?,
                date_applied: args.date.unwrap_or_else(|| Local::now().date_naive()),
                status: args.status,
                employment_type: args.employment_type,
                role: args.role,
                notes: args.notes,
                expected_salary: args.salary.filter(|s| !s.trim().is_empty()),
            };
            storage.save_application(&user.id, &app).await?;
            println!("Added application '{}' ({})", app.position, app.id);
        }
        AppCommands::Show { id, json: json_output } => {
            let app = find_application(storage, &user.id, &id).await?;
            let company = storage.company(&user.id, &app.company_id).await?;

            if json_output {
                let output = json!({
                    "application": app,
                    "company": company,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
                return Ok(());
            }

            println!("Position: {}", app.position);
            println!("ID: {}", app.id);
            match &company {
                Some(c) => println!("Company: {} ({})", c.name, c.id),
                None => println!("Company: {} (deleted)", app.company_id),
            }
            println!("Status: {}", app.status);
            println!("Applied: {}", app.date_applied);
            println!("Type: {}", app.employment_type);
            println!("Role: {}", app.role);
            if let Some(salary) = &app.expected_salary {
                println!("Expected salary: {salary}");
            }
            if !app.notes.is_empty() {
                println!("Notes: {}", app.notes);
            }
        }
        AppCommands::Update(args) => {
            let mut app = find_application(storage, &user.id, &args.id).await?;
            args.apply(&mut app);
            storage.update_application(&app).await?;
            println!("Updated application '{}'", app.position);
        }
        AppCommands::Status { id, status } => {
            if !storage
                .update_application_status(&user.id, &id, status)
                .await?
            {
                bail!("Application not found: {id}");
            }
            println!("Application {id} is now {status}");
        }
        AppCommands::Delete { id, force } => {
            let app = find_application(storage, &user.id, &id).await?;
            if !confirm(&format!("Delete application '{}'?", app.position), force)? {
                println!("Cancelled.");
                return Ok(());
            }
            storage.delete_application(&user.id, &id).await?;
            println!("Deleted application '{}'", app.position);
        }
        AppCommands::Search { query, json } => {
            let apps = storage.search_applications(&user.id, &query).await?;
            let companies = storage.companies(&user.id).await?;
            print_applications(&apps, &companies, json)?;
        }
        AppCommands::Orphans { json } => {
            let apps = storage.orphaned_applications(&user.id).await?;
            print_applications(&apps, &[], json)?;
        }
    }

    Ok(())
}

async fn find_application(
    storage: &Storage,
    user_id: &str,
    id: &str,
) -> anyhow::Result<Application> {
    storage
        .application(user_id, id)
        .await?
        .with_context(|| format!("Application not found: {id}"))
}

fn print_applications(
    apps: &[Application],
    companies: &[Company],
    json_output: bool,
) -> anyhow::Result<()> {
    if json_output {
        let output = json!({
            "count": apps.len(),
            "applications": apps,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if apps.is_empty() {
        println!("No applications found.");
        return Ok(());
    }

    let names: HashMap<&str, &str> = companies
        .iter()
        .map(|c| (c.id.as_str(), c.name.as_str()))
        .collect();

    println!("Applications:");
    for app in apps {
        let company = names
            .get(app.company_id.as_str())
            .copied()
            .unwrap_or("(unknown company)");
        println!(
            "  {} - {} at {} [{}] applied {}",
            app.id, app.position, company, app.status, app.date_applied
        );
    }
    Ok(())
}
