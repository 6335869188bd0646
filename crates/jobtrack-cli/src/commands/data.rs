//! Backup and reporting CLI commands
//!
//! Handles: jobtrack export/import/info/stats

use anyhow::Context;
use chrono::Local;
use serde_json::json;
use std::path::{Path, PathBuf};

use jobtrack_core::export::{backup_file_name, parse_backup};
use jobtrack_core::model::ApplicationStatus;
use jobtrack_core::Storage;

use super::{confirm, require_user};

/// Write a backup of the logged-in user's data
pub async fn export(storage: &Storage, output: Option<PathBuf>, stdout: bool) -> anyhow::Result<()> {
    let user = require_user(storage).await?;
    let json = storage.export_user_data_json(&user.id).await?;

    if stdout {
        println!("{json}");
        return Ok(());
    }

    let path = output.unwrap_or_else(|| PathBuf::from(backup_file_name(Local::now().date_naive())));
    std::fs::write(&path, &json)
        .with_context(|| format!("Failed to write backup to {}", path.display()))?;
    println!("Exported backup to {}", path.display());
    Ok(())
}

/// Replace the logged-in user's data with a backup
pub async fn import(storage: &Storage, file: &Path, force: bool) -> anyhow::Result<()> {
    let user = require_user(storage).await?;
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read backup {}", file.display()))?;

    // Validate up front so the prompt can show what will be imported
    let preview = parse_backup(&json)?.preview();
    println!(
        "Backup{} has {} companies and {} applications.",
        preview
            .email
            .as_deref()
            .map(|email| format!(" of {email}"))
            .unwrap_or_default(),
        preview.company_count,
        preview.application_count
    );
    if preview.orphaned_count > 0 {
        println!(
            "Warning: {} application(s) reference companies missing from the backup.",
            preview.orphaned_count
        );
    }

    if !confirm("Replace all of your current data with this backup?", force)? {
        println!("Cancelled.");
        return Ok(());
    }

    let preview = storage.import_user_data(&user.id, &json).await?;
    println!(
        "Imported {} companies and {} applications.",
        preview.company_count, preview.application_count
    );
    Ok(())
}

/// Show which backend is active
pub async fn info(storage: &Storage, json_output: bool) -> anyhow::Result<()> {
    let info = storage.storage_info().await?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Storage: {}", info.backend);
    println!("Capacity: {}", info.estimated_size);
    println!("Features:");
    for feature in &info.features {
        println!("  - {feature}");
    }
    Ok(())
}

/// Show per-status application counts
pub async fn stats(storage: &Storage, json_output: bool) -> anyhow::Result<()> {
    let user = require_user(storage).await?;
    let counts = storage.status_counts(&user.id).await?;
    let companies = storage.companies(&user.id).await?.len();
    let total: usize = counts.values().sum();

    if json_output {
        let by_status: serde_json::Map<String, serde_json::Value> = counts
            .iter()
            .map(|(status, count)| (status.to_string(), json!(count)))
            .collect();
        let output = json!({
            "companies": companies,
            "applications": total,
            "byStatus": by_status,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Companies: {companies}");
    println!("Applications: {total}");
    for status in ApplicationStatus::ALL {
        let count = counts.get(&status).copied().unwrap_or(0);
        if count > 0 {
            println!("  {status}: {count}");
        }
    }
    Ok(())
}
