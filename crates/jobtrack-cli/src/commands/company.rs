//! Company CLI commands
//!
//! Handles: jobtrack company add/list/show/update/delete/search

use anyhow::Context;
use clap::{Args, Subcommand};
use serde_json::json;

use jobtrack_core::model::{new_id, Company, CompanyType, CustomField};
use jobtrack_core::Storage;

use super::{confirm, non_empty, parse_custom_field, require_user};

/// Company commands
#[derive(Subcommand)]
pub enum CompanyCommands {
    /// List your companies
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Track a new company
    Add(CompanyAddArgs),
    /// Show a company and its applications
    Show {
        /// Company ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change fields of a company
    Update(CompanyUpdateArgs),
    /// Delete a company and all of its applications
    Delete {
        /// Company ID
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Find companies by name or location
    Search {
        /// Text to look for (case-insensitive)
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Arguments for `jobtrack company add`
#[derive(Args)]
pub struct CompanyAddArgs {
    /// Company name
    pub name: String,

    /// Location
    #[arg(long, default_value = "")]
    pub location: String,

    /// Company type (Startup, Product, Service, Consulting, Consultancy, FAANG, Other)
    #[arg(long = "type", value_name = "TYPE", default_value = "Other")]
    pub company_type: CompanyType,

    /// Culture rating, 1 to 5
    #[arg(long, default_value_t = 3)]
    pub rating: u8,

    /// Employee-count bucket, e.g. "50-200"
    #[arg(long, default_value = "")]
    pub employees: String,

    /// Entry-level salary
    #[arg(long, default_value = "")]
    pub fresher_salary: String,

    /// Description
    #[arg(long, default_value = "")]
    pub description: String,

    /// Website
    #[arg(long)]
    pub website: Option<String>,

    /// Custom fields (LABEL=value, can specify multiple times)
    #[arg(long = "field", value_name = "LABEL=VALUE", value_parser = parse_custom_field)]
    pub fields: Vec<CustomField>,
}

impl CompanyAddArgs {
    fn into_company(self) -> anyhow::Result<Company> {
        Ok(Company {
            id: new_id(),
            name: non_empty("Company name", &self.name)?,
            description: self.description,
            employee_range: self.employees,
            fresher_salary: self.fresher_salary,
            location: self.location,
            company_type: self.company_type,
            culture_rating: self.rating,
            website: self.website.filter(|w| !w.trim().is_empty()),
            custom_fields: self.fields,
        })
    }
}

/// Arguments for `jobtrack company update`
#[derive(Args)]
pub struct CompanyUpdateArgs {
    /// Company ID
    pub id: String,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// New location
    #[arg(long)]
    pub location: Option<String>,

    /// New company type
    #[arg(long = "type", value_name = "TYPE")]
    pub company_type: Option<CompanyType>,

    /// New culture rating
    #[arg(long)]
    pub rating: Option<u8>,

    /// New employee-count bucket
    #[arg(long)]
    pub employees: Option<String>,

    /// New entry-level salary
    #[arg(long)]
    pub fresher_salary: Option<String>,

    /// New description
    #[arg(long)]
    pub description: Option<String>,

    /// New website (empty string clears it)
    #[arg(long)]
    pub website: Option<String>,

    /// Replace all custom fields
    #[arg(long = "field", value_name = "LABEL=VALUE", value_parser = parse_custom_field)]
    pub fields: Vec<CustomField>,

    /// Add to existing custom fields
    #[arg(long = "add-field", value_name = "LABEL=VALUE", value_parser = parse_custom_field)]
    pub add_fields: Vec<CustomField>,
}

impl CompanyUpdateArgs {
    fn apply(self, company: &mut Company) {
        if let Some(name) = self.name {
            company.name = name;
        }
        if let Some(location) = self.location {
            company.location = location;
        }
        if let Some(company_type) = self.company_type {
            company.company_type = company_type;
        }
        if let Some(rating) = self.rating {
            company.culture_rating = rating;
        }
        if let Some(employees) = self.employees {
            company.employee_range = employees;
        }
        if let Some(salary) = self.fresher_salary {
            company.fresher_salary = salary;
        }
        if let Some(description) = self.description {
            company.description = description;
        }
        if let Some(website) = self.website {
            company.website = (!website.trim().is_empty()).then_some(website);
        }
        if !self.fields.is_empty() {
            company.custom_fields = self.fields;
        }
        company.custom_fields.extend(self.add_fields);
    }
}

/// Execute company command
pub async fn execute(storage: &Storage, cmd: CompanyCommands) -> anyhow::Result<()> {
    let user = require_user(storage).await?;

    match cmd {
        CompanyCommands::List { json } => {
            let companies = storage.companies(&user.id).await?;
            print_companies(&companies, json)?;
        }
        CompanyCommands::Add(args) => {
            let company = args.into_company()?;
            storage.save_company(&user.id, &company).await?;
            println!("Added company '{}' ({})", company.name, company.id);
        }
        CompanyCommands::Show { id, json: json_output } => {
            let company = storage
                .company(&user.id, &id)
                .await?
                .with_context(|| format!("Company not found: {id}"))?;
            let applications = storage.applications_for_company(&user.id, &id).await?;

            if json_output {
                let output = json!({
                    "company": company,
                    "applications": applications,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
                return Ok(());
            }

            println!("Company: {}", company.name);
            println!("ID: {}", company.id);
            println!("Type: {}", company.company_type);
            println!("Location: {}", company.location);
            println!("Culture: {}/5", company.culture_rating);
            if !company.employee_range.is_empty() {
                println!("Employees: {}", company.employee_range);
            }
            if !company.fresher_salary.is_empty() {
                println!("Fresher salary: {}", company.fresher_salary);
            }
            if let Some(website) = &company.website {
                println!("Website: {website}");
            }
            if !company.description.is_empty() {
                println!("Description: {}", company.description);
            }
            for field in &company.custom_fields {
                println!("{}: {}", field.label, field.value);
            }

            println!("\nApplications: {}", applications.len());
            for app in &applications {
                println!(
                    "  {} - {} [{}] applied {}",
                    app.id, app.position, app.status, app.date_applied
                );
            }
        }
        CompanyCommands::Update(args) => {
            let mut company = storage
                .company(&user.id, &args.id)
                .await?
                .with_context(|| format!("Company not found: {}", args.id))?;
            args.apply(&mut company);
            storage.update_company(&company).await?;
            println!("Updated company '{}'", company.name);
        }
        CompanyCommands::Delete { id, force } => {
            let company = storage
                .company(&user.id, &id)
                .await?
                .with_context(|| format!("Company not found: {id}"))?;
            let count = storage.applications_for_company(&user.id, &id).await?.len();

            let prompt = format!(
                "Delete company '{}' and its {count} application(s)?",
                company.name
            );
            if !confirm(&prompt, force)? {
                println!("Cancelled.");
                return Ok(());
            }

            let outcome = storage.delete_company(&user.id, &id).await?;
            println!(
                "Deleted company '{}' and {} application(s)",
                company.name, outcome.applications_deleted
            );
        }
        CompanyCommands::Search { query, json } => {
            let companies = storage.search_companies(&user.id, &query).await?;
            print_companies(&companies, json)?;
        }
    }

    Ok(())
}

fn print_companies(companies: &[Company], json_output: bool) -> anyhow::Result<()> {
    if json_output {
        let output = json!({
            "count": companies.len(),
            "companies": companies,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if companies.is_empty() {
        println!("No companies found.");
        return Ok(());
    }

    println!("Companies:");
    for c in companies {
        println!(
            "  {} - {} ({}, {}) {}/5",
            c.id, c.name, c.company_type, c.location, c.culture_rating
        );
    }
    Ok(())
}
