//! Account CLI commands
//!
//! Handles: jobtrack register/login/logout/whoami/profile

use anyhow::bail;
use clap::Subcommand;
use serde_json::json;

use jobtrack_core::credential::{hash_password, verify_password};
use jobtrack_core::{Storage, StoredUser, User};

use super::{non_empty, require_user};

/// Profile commands
#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Change your display name
    Rename {
        /// New display name
        name: String,
    },
}

/// Create an account and log in
pub async fn register(
    storage: &Storage,
    email: &str,
    name: &str,
    password: &str,
) -> anyhow::Result<()> {
    let email = non_empty("Email", email)?.to_lowercase();
    let name = non_empty("Name", name)?;
    if password.is_empty() {
        bail!("Password cannot be empty");
    }

    if storage.user_exists(&email).await? {
        bail!("User already exists: {email}");
    }

    let user = User::new(email, name);
    let stored = StoredUser::new(user.clone(), hash_password(password)?);
    storage.save_user(&stored).await?;
    storage.login(&user.id).await?;

    println!("Registered and logged in as {} <{}>", user.name, user.email);
    Ok(())
}

pub async fn login(storage: &Storage, email: &str, password: &str) -> anyhow::Result<()> {
    let email = email.trim().to_lowercase();
    let Some(stored) = storage.get_user(&email).await? else {
        bail!("Invalid email or password");
    };
    if !verify_password(password, &stored.password)? {
        bail!("Invalid email or password");
    }

    storage.login(&stored.user.id).await?;
    println!("Logged in as {} <{}>", stored.user.name, stored.user.email);
    Ok(())
}

pub fn logout(storage: &Storage) -> anyhow::Result<()> {
    storage.logout()?;
    println!("Logged out.");
    Ok(())
}

pub async fn whoami(storage: &Storage, json_output: bool) -> anyhow::Result<()> {
    let user = storage.current_user().await?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&json!({ "user": user }))?);
        return Ok(());
    }

    match user {
        Some(user) => {
            println!("{} <{}>", user.name, user.email);
            println!("ID: {}", user.id);
            println!("Member since: {}", user.created_at.format("%Y-%m-%d"));
            println!("Last login: {}", user.last_login.format("%Y-%m-%d %H:%M"));
        }
        None => println!("Not logged in."),
    }
    Ok(())
}

/// Execute profile command
pub async fn execute_profile(storage: &Storage, cmd: ProfileCommands) -> anyhow::Result<()> {
    match cmd {
        ProfileCommands::Rename { name } => {
            require_user(storage).await?;
            let user = storage.update_current_user_profile(&name).await?;
            println!("Display name changed to '{}'", user.name);
        }
    }
    Ok(())
}
