//! CLI command handlers
//!
//! Each record kind (company, application) has its own module; account
//! and backup commands live in `account` and `data`.

pub mod account;
pub mod application;
pub mod company;
pub mod data;

use anyhow::{bail, Context};
use jobtrack_core::model::CustomField;
use jobtrack_core::{Storage, User};
use std::io::{self, Write};

/// The logged-in user, or an error telling the caller to log in
pub async fn require_user(storage: &Storage) -> anyhow::Result<User> {
    storage
        .current_user()
        .await?
        .context("Not logged in. Run `jobtrack login` first.")
}

/// Parse `LABEL=VALUE` into a custom field
pub fn parse_custom_field(s: &str) -> Result<CustomField, String> {
    let (label, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid field format: {s} (expected LABEL=value)"))?;
    if label.trim().is_empty() {
        return Err("Field label cannot be empty".to_string());
    }
    Ok(CustomField {
        label: label.trim().to_string(),
        value: value.to_string(),
    })
}

/// Ask for confirmation on stdin unless `force` is set
pub fn confirm(prompt: &str, force: bool) -> anyhow::Result<bool> {
    if force {
        return Ok(true);
    }
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Fail unless `s` has visible content
pub fn non_empty(field: &str, s: &str) -> anyhow::Result<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        bail!("{field} cannot be empty");
    }
    Ok(trimmed.to_string())
}
