//! jsondb CLI - command line façade over the database service

use anyhow::Context;
use clap::{Parser, Subcommand};
use jsondb::{Attribute, DatabaseService, Error, ErrorKind, Row, RowId, Settings, TableScheme};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jsondb")]
#[command(about = "A file-backed database of JSON tables", long_about = None)]
struct Cli {
    /// YAML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Storage directory (overrides the settings file)
    #[arg(short, long)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List databases
    Databases,

    /// Create an empty database
    CreateDb { name: String },

    /// Drop a database with all its tables
    DropDb { name: String },

    /// Show a database and its table names
    ShowDb { name: String },

    /// Create a table
    CreateTable {
        db: String,
        table: String,
        /// Attribute as name:type, in column order
        #[arg(long = "attr", value_parser = parse_attribute, required = true)]
        attributes: Vec<Attribute>,
    },

    /// Drop a table
    DropTable { db: String, table: String },

    /// Show a table with all its rows
    Table { db: String, table: String },

    /// Show a table restricted to some attributes
    Project {
        db: String,
        table: String,
        /// Attribute to keep
        #[arg(long = "attr", required = true)]
        attributes: Vec<String>,
    },

    /// Show a row of default values for a table
    NewRow { db: String, table: String },

    /// Add a row, one value per attribute
    AddRow {
        db: String,
        table: String,
        #[arg(allow_hyphen_values = true)]
        values: Vec<String>,
    },

    /// Replace the values of a row
    UpdateRow {
        db: String,
        table: String,
        id: RowId,
        #[arg(allow_hyphen_values = true)]
        values: Vec<String>,
    },

    /// Delete a row
    DeleteRow { db: String, table: String, id: RowId },

    /// List the registered data types
    Types,
}

/// Database as shown to users: tables flattened to their names
#[derive(Serialize)]
struct DatabaseView {
    name: String,
    table_names: Vec<String>,
}

fn parse_attribute(s: &str) -> Result<Attribute, String> {
    let (name, data_type) = s
        .split_once(':')
        .ok_or_else(|| format!("expected name:type, got '{}'", s))?;
    Ok(Attribute::new(name, data_type))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(storage) = &cli.storage {
        settings.storage_path = storage.clone();
    }
    Ok(settings)
}

fn table_not_found(db: &str, table: &str) -> Error {
    Error::TableNotFound {
        database: db.to_string(),
        table: table.to_string(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = load_settings(&cli)?;
    let service = DatabaseService::new(settings).context("Invalid settings")?;

    match cli.command {
        Commands::Databases => print_json(&service.get_database_names().await?),
        Commands::CreateDb { name } => {
            service.create_database(&name).await?;
            println!("Database '{}' created.", name);
            Ok(())
        }
        Commands::DropDb { name } => {
            service.drop_database(&name).await?;
            println!("Database '{}' dropped.", name);
            Ok(())
        }
        Commands::ShowDb { name } => {
            let database = service
                .get_database(&name)
                .await?
                .ok_or(Error::DatabaseNotFound { name })?;
            print_json(&DatabaseView {
                table_names: database.table_names(),
                name: database.name,
            })
        }
        Commands::CreateTable {
            db,
            table,
            attributes,
        } => {
            service
                .create_table(&db, TableScheme::new(&table, attributes))
                .await?;
            println!("Table '{}' created in '{}'.", table, db);
            Ok(())
        }
        Commands::DropTable { db, table } => {
            service.drop_table(&db, &table).await?;
            println!("Table '{}' dropped from '{}'.", table, db);
            Ok(())
        }
        Commands::Table { db, table } => {
            let found = service
                .get_table(&db, &table)
                .await?
                .ok_or_else(|| table_not_found(&db, &table))?;
            print_json(&found)
        }
        Commands::Project {
            db,
            table,
            attributes,
        } => {
            let projected = service
                .get_table_projection(&db, &table, attributes.as_slice())
                .await?
                .ok_or_else(|| table_not_found(&db, &table))?;
            print_json(&projected)
        }
        Commands::NewRow { db, table } => {
            let found = service
                .get_table(&db, &table)
                .await?
                .ok_or_else(|| table_not_found(&db, &table))?;
            let row = service.validation().types().default_row(&found.attributes);
            print_json(&row.value)
        }
        Commands::AddRow { db, table, values } => {
            let row = service.add_row(&db, &table, Row::new(values)).await?;
            println!("Row {} added to '{}'.", row.id, table);
            Ok(())
        }
        Commands::UpdateRow {
            db,
            table,
            id,
            values,
        } => {
            service
                .update_row(&db, &table, Row::with_id(id, values))
                .await?;
            println!("Row {} updated.", id);
            Ok(())
        }
        Commands::DeleteRow { db, table, id } => {
            service.delete_row(&db, &table, id).await?;
            println!("Row {} deleted.", id);
            Ok(())
        }
        Commands::Types => {
            let names: Vec<&str> = service.validation().types().names().collect();
            print_json(&names)
        }
    }
}

/// Print an error and pick the exit code for its kind
fn report(err: &anyhow::Error) -> ExitCode {
    let Some(db_err) = err.downcast_ref::<Error>() else {
        eprintln!("Error: {:#}", err);
        return ExitCode::FAILURE;
    };

    eprintln!("Error: {}", db_err.public_message());
    if let Some(hint) = db_err.suggestion() {
        eprintln!("Hint: {}", hint);
    }

    ExitCode::from(match db_err.kind() {
        ErrorKind::BadRequest => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::Conflict => 4,
        ErrorKind::Internal => 1,
    })
}
