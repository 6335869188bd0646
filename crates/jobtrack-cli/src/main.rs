//! jobtrack CLI - Command-line interface for the job-application tracker
//!
//! Provides `jobtrack register`, `jobtrack company`, `jobtrack app`,
//! `jobtrack export`, and other commands.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use jobtrack_core::config::default_data_dir;
use jobtrack_core::{Storage, StorageConfig};

use commands::account::ProfileCommands;
use commands::application::AppCommands;
use commands::company::CompanyCommands;

const LOG_ENV: &str = "JOBTRACK_LOG";

#[derive(Parser)]
#[command(name = "jobtrack")]
#[command(about = "jobtrack - Track companies and job applications")]
#[command(version)]
struct Cli {
    /// Data directory (defaults to $JOBTRACK_DATA_DIR or ~/.jobtrack)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and log in
    Register {
        /// Email address (login key)
        #[arg(long)]
        email: String,
        /// Display name
        #[arg(long)]
        name: String,
        /// Password
        #[arg(long)]
        password: String,
    },
    /// Log in
    Login {
        /// Email address
        #[arg(long)]
        email: String,
        /// Password
        #[arg(long)]
        password: String,
    },
    /// Log out
    Logout,
    /// Show the logged-in user
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage your profile
    Profile {
        #[command(subcommand)]
        action: ProfileCommands,
    },
    /// Manage companies
    Company {
        #[command(subcommand)]
        action: CompanyCommands,
    },
    /// Manage job applications
    App {
        #[command(subcommand)]
        action: AppCommands,
    },
    /// Export your data as a JSON backup
    Export {
        /// Output file (defaults to jobtrack-backup-<date>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print to stdout instead of writing a file
        #[arg(long, conflicts_with = "output")]
        stdout: bool,
    },
    /// Replace your data with a JSON backup
    Import {
        /// Backup file
        file: PathBuf,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Show which storage backend is active
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show application counts by status
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info,jobtrack_core=debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_storage(data_dir: Option<PathBuf>) -> anyhow::Result<Storage> {
    let data_dir = data_dir
        .or_else(default_data_dir)
        .context("Cannot determine a data directory; pass --data-dir")?;
    let config = StorageConfig::load(&data_dir)?;
    Ok(Storage::with_file_session(config))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let storage = open_storage(cli.data_dir)?;

    match cli.command {
        Commands::Register {
            email,
            name,
            password,
        } => commands::account::register(&storage, &email, &name, &password).await,
        Commands::Login { email, password } => {
            commands::account::login(&storage, &email, &password).await
        }
        Commands::Logout => commands::account::logout(&storage),
        Commands::Whoami { json } => commands::account::whoami(&storage, json).await,
        Commands::Profile { action } => commands::account::execute_profile(&storage, action).await,
        Commands::Company { action } => commands::company::execute(&storage, action).await,
        Commands::App { action } => commands::application::execute(&storage, action).await,
        Commands::Export { output, stdout } => commands::data::export(&storage, output, stdout).await,
        Commands::Import { file, force } => commands::data::import(&storage, &file, force).await,
        Commands::Info { json } => commands::data::info(&storage, json).await,
        Commands::Stats { json } => commands::data::stats(&storage, json).await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
