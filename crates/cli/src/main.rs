mod config;
mod error;

use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use policy::{Action, AuthorizationRegistry, Decision, ResourceType};
use serde::Deserialize;
use storage::{ChangeSet, Document, ModificationAction, PendingModification, SqliteSession};
use submit::Caller;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "tombstone.toml";

#[derive(Parser)]
#[command(name = "tombstone")]
#[command(about = "Authorization and soft-delete for submitted change-sets", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// SQLite database (defaults to the user data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which actions a caller may perform on a resource type
    Check {
        /// Resource type name
        #[arg(short, long)]
        resource: String,
        /// Caller role (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,
    },
    /// Authorize and commit a JSON change-set
    Submit {
        /// JSON file holding a list of changes
        #[arg(long)]
        changes: PathBuf,
        /// Caller id
        #[arg(short, long)]
        user: Option<String>,
        /// Caller role (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,
    },
    /// List stored documents of a resource type
    Show {
        /// Resource type name
        #[arg(short, long)]
        resource: String,
        /// Include soft-deleted documents
        #[arg(short, long)]
        all: bool,
    },
}

/// One entry of a changes file.
#[derive(Debug, Deserialize)]
struct ChangeEntry {
    action: ModificationAction,
    #[serde(flatten)]
    document: Document,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Check { resource, roles } => cmd_check(&config, &resource, roles),
        Commands::Submit {
            changes,
            user,
            roles,
        } => {
            let caller = match user {
                Some(id) => Caller::new(id),
                None => Caller::anonymous(),
            }
            .with_roles(roles);
            cmd_submit(&config, cli.db, &changes, caller).await
        }
        Commands::Show { resource, all } => cmd_show(&config, cli.db, &resource, all),
    }
}

fn cmd_check(config: &Config, resource: &str, roles: Vec<String>) -> Result<()> {
    let registry = config.registry(Caller::anonymous().with_roles(roles))?;
    let resource_type = ResourceType::from(resource);

    if registry.lookup(&resource_type).is_err() {
        return Err(Error::UnknownResource(resource.to_string()));
    }

    println!("Resource: {resource_type}\n");
    for action in Action::ALL {
        match registry.check(&resource_type, action) {
            Decision::Allow => println!("{action:<8}  allow"),
            Decision::Deny { reason } => println!("{action:<8}  deny ({reason})"),
        }
    }

    Ok(())
}

async fn cmd_submit(
    config: &Config,
    db: Option<PathBuf>,
    changes_path: &Path,
    caller: Caller,
) -> Result<()> {
    let interceptor = config.interceptor()?;
    let registry = config.registry(caller.clone())?;

    let entries: Vec<ChangeEntry> = serde_json::from_str(&std::fs::read_to_string(changes_path)?)?;

    authorize(&registry, &entries)?;

    let changes: ChangeSet = entries
        .into_iter()
        .map(|entry| PendingModification::new(entry.action, entry.document))
        .collect();

    let db_path = db_path(db);
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let session = SqliteSession::open(&db_path)?;

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };
    let result = interceptor.execute(&session, &caller, changes, &cancel).await;
    watcher.abort();
    let result = result?;
    tracing::info!(
        "Submitted {} changes ({} soft-deleted)",
        result.changes.len(),
        result.soft_deleted
    );

    println!(
        "Committed {} changes to {}",
        result.changes.len(),
        db_path.display()
    );
    println!(
        "  inserted: {}  updated: {} ({} soft-deleted)  deleted: {}",
        result.summary.inserted,
        result.summary.updated,
        result.soft_deleted,
        result.summary.deleted
    );

    Ok(())
}

/// Refuse the whole batch if any entry is denied; a remove needs delete.
fn authorize(registry: &AuthorizationRegistry, entries: &[ChangeEntry]) -> Result<()> {
    for entry in entries {
        let action = match entry.action {
            ModificationAction::Insert => Action::Insert,
            ModificationAction::Update => Action::Update,
            ModificationAction::Remove => Action::Delete,
        };
        if let Decision::Deny { reason } = registry.check(&entry.document.resource_type, action) {
            tracing::warn!("Refused change-set: {reason}");
            return Err(Error::Denied { reason });
        }
    }
    Ok(())
}

fn cmd_show(config: &Config, db: Option<PathBuf>, resource: &str, all: bool) -> Result<()> {
    let resource_type = ResourceType::from(resource);
    if config.resource(&resource_type).is_none() {
        return Err(Error::UnknownResource(resource.to_string()));
    }

    let db_path = db_path(db);
    if !db_path.exists() {
        return Err(Error::DatabaseNotFound { path: db_path });
    }
    let session = SqliteSession::open(&db_path)?;

    let flag = config.soft_delete.flag_property_name.as_str();
    let documents: Vec<_> = session
        .list(&resource_type)?
        .into_iter()
        .filter(|stored| all || stored.document.flag(flag) != Some(true))
        .collect();

    if documents.is_empty() {
        println!("No {resource_type} found.");
        return Ok(());
    }

    println!("{:<24}  {:<16}  {:<8}  FIELDS", "KEY", "UPDATED", "STATUS");
    println!("{}", "-".repeat(80));

    for stored in documents {
        let updated = Local
            .from_utc_datetime(&stored.updated_at.naive_utc())
            .format("%Y-%m-%d %H:%M");
        let status = if stored.document.flag(flag) == Some(true) {
            "deleted"
        } else {
            "active"
        };
        let fields = serde_json::Value::Object(stored.document.fields);
        println!(
            "{:<24}  {:<16}  {:<8}  {fields}",
            stored.document.key, updated, status
        );
    }

    Ok(())
}

fn db_path(db: Option<PathBuf>) -> PathBuf {
    db.unwrap_or_else(|| {
        dirs_data_dir()
            .unwrap_or_else(|| ".tombstone".into())
            .join("records.db")
    })
}

fn dirs_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share/tombstone"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
            .map(|p| p.join("tombstone"))
    }
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|h| PathBuf::from(h).join("tombstone"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}
