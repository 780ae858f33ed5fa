// SPDX-FileCopyrightText: 2026 SealDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SealDB - encrypted SQLite databases with managed schema versions.
//!
//! This is the binary entry point.

mod query;
mod rekey;
mod schema;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sealdb_config::model::SealdbConfig;
use sealdb_core::SealError;
use sealdb_storage::OpenHelper;
use tracing::error;

use crate::schema::ScriptSchema;

/// SealDB - encrypted SQLite databases with managed schema versions.
#[derive(Parser, Debug)]
#[command(name = "sealdb", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the lookup hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Open the database, bring its schema up to date and report its state.
    Status {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Run one SQL statement and print the resulting rows.
    Query {
        sql: String,
        /// Positional parameter; repeat for ?1, ?2, ...
        #[arg(long = "arg")]
        args: Vec<String>,
        /// Cancel the query after this many milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Re-encrypt the database with the password stored in a file.
    Rekey {
        #[arg(long)]
        password_file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => sealdb_config::load_and_validate_path(path),
        None => sealdb_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            sealdb_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.log_level);

    let result = match cli.command.unwrap_or(Commands::Status { json: false }) {
        Commands::Status { json } => status::run_status(&config, json),
        Commands::Query {
            sql,
            args,
            timeout_ms,
        } => query::run_query(&config, &sql, &args, timeout_ms),
        Commands::Rekey { password_file } => rekey::run_rekey(&config, &password_file),
    };

    if let Err(e) = result {
        error!(error = %e, "command failed");
        eprintln!("sealdb: {e}");
        std::process::exit(1);
    }
}

/// Open a helper for the configured database with script-driven schema callbacks.
pub(crate) fn open_helper(config: &SealdbConfig) -> Result<OpenHelper, SealError> {
    OpenHelper::from_config(&config.database, ScriptSchema::from_config(&config.database))
}

/// Initialize the tracing subscriber; `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sealdb={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
