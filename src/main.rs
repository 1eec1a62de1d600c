//! Binary entry point for recordkit.
//!
//! A thin CLI over [`RecordStore`]: every subcommand maps to one store
//! operation and prints its result as JSON.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use recordkit::config::{RecordkitConfig, load_dotenv};
use recordkit::observability;
use recordkit::{Fields, FilterQuery, RecordStore, SqliteDriver, StoreDriver, StoreSettings};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

/// Recordkit - generic CRUD and filtered queries over relational tables.
#[derive(Parser)]
#[command(name = "recordkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "RECORDKIT_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Database file (overrides config and environment).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Check that the store answers.
    Health,

    /// Fetch one row by id.
    Get {
        /// Table or view name.
        table: String,
        /// Row identifier.
        id: i64,
    },

    /// Fetch every row.
    List {
        /// Table or view name.
        table: String,
    },

    /// Fetch the rows matching a filter.
    Query {
        /// Table or view name.
        table: String,
        /// Filter as JSON, e.g. `{"and":{"stock":[{"operator":"lt","value":"10"}]}}`.
        filter: String,
    },

    /// Insert one row.
    Insert {
        /// Table name.
        table: String,
        /// Fields as a JSON object.
        fields: String,
    },

    /// Insert several rows sharing the same fields.
    InsertMany {
        /// Table name.
        table: String,
        /// Records as a JSON array of objects.
        records: String,
    },

    /// Update one row by id.
    Update {
        /// Table name.
        table: String,
        /// Row identifier.
        id: i64,
        /// Patch as a JSON object.
        patch: String,
    },

    /// Delete rows by id.
    Delete {
        /// Table name.
        table: String,
        /// Row identifiers.
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Run a SQL script (schema fixtures, seed data).
    Exec {
        /// Path to the script.
        script: PathBuf,
    },
}

/// Main entry point.
fn main() -> ExitCode {
    load_dotenv();
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init(&config.logging, cli.verbose) {
        eprintln!("Failed to initialize observability: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Loads configuration: file, then environment, then `--db`.
fn load_config(cli: &Cli) -> Result<RecordkitConfig, Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => RecordkitConfig::load_from_file(path)?,
        None => RecordkitConfig::load_default(),
    }
    .apply_env_overrides();

    Ok(match &cli.db {
        Some(path) => config.with_db_path(path),
        None => config,
    })
}

/// Runs the selected command.
fn run_command(
    command: Commands,
    config: &RecordkitConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let driver = Arc::new(SqliteDriver::from_config(&config.database)?);
    let store = RecordStore::new(driver.clone(), StoreSettings::from(&config.database));

    let result = (|| -> Result<(), Box<dyn std::error::Error>> {
        match command {
            Commands::Health => cmd_health(&store, driver.backend_name()),
            Commands::Get { table, id } => print_json(&store.fetch_by_id(&table, id)?),
            Commands::List { table } => print_json(&store.fetch_all(&table)?),
            Commands::Query { table, filter } => cmd_query(&store, &table, &filter),
            Commands::Insert { table, fields } => cmd_insert(&store, &table, &fields),
            Commands::InsertMany { table, records } => cmd_insert_many(&store, &table, &records),
            Commands::Update { table, id, patch } => cmd_update(&store, &table, id, &patch),
            Commands::Delete { table, ids } => cmd_delete(&store, &table, &ids),
            Commands::Exec { script } => cmd_exec(&driver, &script),
        }
    })();

    finish_command(result, store.close())
}

/// Combines a command result with the close result.
///
/// The command's own error wins; a close failure is only reported on stderr
/// then.
fn finish_command(
    result: Result<(), Box<dyn std::error::Error>>,
    closed: recordkit::Result<()>,
) -> Result<(), Box<dyn std::error::Error>> {
    match (result, closed) {
        (Err(e), Err(close_err)) => {
            eprintln!("Failed to close store: {close_err}");
            Err(e)
        },
        (Err(e), Ok(())) => Err(e),
        (Ok(()), closed) => Ok(closed?),
    }
}

fn cmd_health(store: &RecordStore, backend: &str) -> Result<(), Box<dyn std::error::Error>> {
    store.check_health()?;
    print_json(&serde_json::json!({ "status": "ok", "backend": backend }))
}

fn cmd_query(
    store: &RecordStore,
    table: &str,
    filter: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter: FilterQuery =
        serde_json::from_str(filter).map_err(|e| format!("invalid filter JSON: {e}"))?;
    print_json(&store.fetch_by_filter(table, &filter)?)
}

fn cmd_insert(
    store: &RecordStore,
    table: &str,
    fields: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let fields: Fields =
        serde_json::from_str(fields).map_err(|e| format!("invalid fields JSON: {e}"))?;
    let id = store.insert_one(table, &fields)?;
    print_json(&serde_json::json!({ "id": id }))
}

fn cmd_insert_many(
    store: &RecordStore,
    table: &str,
    records: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let records: Vec<Fields> =
        serde_json::from_str(records).map_err(|e| format!("invalid records JSON: {e}"))?;
    let ids = store.insert_many(table, &records)?;
    print_json(&serde_json::json!({ "ids": ids }))
}

fn cmd_update(
    store: &RecordStore,
    table: &str,
    id: i64,
    patch: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let patch: Fields =
        serde_json::from_str(patch).map_err(|e| format!("invalid patch JSON: {e}"))?;
    store.update_by_id(table, &patch, id)?;
    print_json(&store.fetch_by_id(table, id)?)
}

fn cmd_delete(
    store: &RecordStore,
    table: &str,
    ids: &[i64],
) -> Result<(), Box<dyn std::error::Error>> {
    match ids {
        [id] => store.delete_by_id(table, *id)?,
        _ => store.delete_by_ids(table, ids)?,
    }
    print_json(&serde_json::json!({ "deleted": ids }))
}

fn cmd_exec(driver: &SqliteDriver, script: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let sql = std::fs::read_to_string(script)
        .map_err(|e| format!("cannot read {}: {e}", script.display()))?;
    driver.run_script(&sql)?;
    print_json(&serde_json::json!({ "executed": script.display().to_string() }))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use recordkit::Error;

    fn close_failure() -> recordkit::Result<()> {
        Err(Error::OperationFailed {
            operation: "close".to_string(),
            cause: "database is locked".to_string(),
        })
    }

    #[test]
    fn test_finish_command_keeps_command_error() {
        let result = finish_command(Err("no such table: books".into()), close_failure());
        let message = result.unwrap_err().to_string();
        assert!(message.contains("no such table"), "{message}");
    }

    #[test]
    fn test_finish_command_reports_close_failure() {
        let result = finish_command(Ok(()), close_failure());
        let message = result.unwrap_err().to_string();
        assert!(message.contains("database is locked"), "{message}");
    }

    #[test]
    fn test_finish_command_success() {
        assert!(finish_command(Ok(()), Ok(())).is_ok());
    }
}
