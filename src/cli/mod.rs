mod commands;
pub mod config;
pub mod error;
pub mod utils;


use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::cli::error::{CliError, CliResult};
use crate::db::Connection;

#[derive(Parser)]
#[command(name = "unidb")]
#[command(author, version, about = "Query any configured database backend", long_about = None)]
pub struct Cli {
    /// Backend config file, YAML or JSON
    #[arg(long, env = "UNIDB_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the database answers
    Health,
    /// Run a SQL statement
    Query {
        /// Statement text, in the backend's own placeholder syntax
        statement: String,
        /// Positional parameter as JSON (repeatable); non-JSON is taken as a string
        #[arg(long = "param")]
        params: Vec<String>,
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Run a document operation against a collection
    Document {
        /// Collection name
        collection: String,
        /// Operation as JSON, e.g. '{"find": {}}'
        operation: String,
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
}

async fn open(config_path: Option<PathBuf>) -> CliResult<Connection> {
    let path = config_path.ok_or(CliError::MissingConfig)?;
    let backend = config::load_config(&path)?;
    debug!(path = %path.display(), backend = %backend.kind(), "Loaded config");

    let conn = Connection::new(backend)?;
    conn.connect().await?;
    Ok(conn)
}

async fn dispatch(conn: &Connection, command: Commands) -> CliResult<String> {
    match command {
        Commands::Health => commands::health::check_health(conn).await,
        Commands::Query {
            statement,
            params,
            format,
        } => commands::query::run_query(conn, &statement, &params, &format).await,
        Commands::Document {
            collection,
            operation,
            format,
        } => commands::document::run_document(conn, &collection, &operation, &format).await,
    }
}

pub async fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        // Show help when no command provided
        let _ = Cli::parse_from(["unidb", "--help"]);
        return Ok(());
    };

    let conn = open(cli.config).await?;
    let result = dispatch(&conn, command).await;
    conn.disconnect().await.map_err(CliError::from)?;

    println!("{}", result?);
    Ok(())
}
