//! authgate client management CLI
//!
//! Inspects the OAuth clients held by the configured storage backend and runs
//! the same startup reconciliation the server performs, without serving HTTP.
//!
//! ## Usage Examples
//!
//! ```bash
//! # List stored clients with their secrets masked
//! STORAGE_BACKEND=sqlite DATABASE_URL=sqlite:authgate.db authgate-clients list
//!
//! # Show one client as pretty JSON
//! authgate-clients --format json-pretty show web_app
//!
//! # Write the configured clients into the database
//! OAUTH_CLIENTS_FILE=clients.json authgate-clients reconcile
//! ```
//!
//! Storage and client settings are read from the same environment variables
//! as the server (`STORAGE_BACKEND`, `DATABASE_URL`, `OAUTH_CLIENTS`,
//! `OAUTH_CLIENTS_FILE`).
//!
//! Exit codes:
//! - 0: Success
//! - 1: Configuration or storage error
//! - 2: Client not found
//! - 3: Reconciliation error

use authgate::{
    config::Config,
    errors::ClientRegistryError,
    oauth::{
        clients::{ClientPersistence, reconcile},
        types::{ClientRegistration, join_scopes},
    },
    storage::{ClientStore, create_storage_backend, parse_storage_backend},
};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Value, json};
use std::process;
use std::sync::Arc;

const SECRET_MASK: &str = "********";

/// Main CLI application structure
#[derive(Parser)]
#[command(
    name = "authgate-clients",
    about = "authgate OAuth client management",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, help = "Enable verbose output for debugging")]
    verbose: bool,

    /// Output format
    #[arg(
        long,
        value_enum,
        default_value = "table",
        help = "Output format for results"
    )]
    format: OutputFormat,

    /// Print client secrets instead of masking them
    #[arg(long)]
    show_secrets: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format options
#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// JSON formatted output
    Json,
    /// Pretty-printed JSON output
    JsonPretty,
    /// Human-readable table format
    Table,
}

#[derive(Subcommand)]
enum Commands {
    /// List every stored client
    List,
    /// Show one stored client
    Show {
        /// Client ID
        client_id: String,
    },
    /// Write the configured clients into storage, replacing stored copies
    Reconcile,
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("error-authgate-cli-1 Configuration failed: {0}")]
    Configuration(anyhow::Error),

    #[error("error-authgate-cli-2 Storage failed: {0}")]
    Storage(anyhow::Error),

    #[error("error-authgate-cli-3 Client not found: {0}")]
    NotFound(String),

    #[error("error-authgate-cli-4 Reconciliation failed: {0}")]
    Reconcile(#[from] ClientRegistryError),

    #[error("error-authgate-cli-5 Output failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    fn exit_code(&self) -> i32 {
        match self {
            AppError::Configuration(_) | AppError::Storage(_) | AppError::Json(_) => 1,
            AppError::NotFound(_) => 2,
            AppError::Reconcile(_) => 3,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(&cli).await {
        eprintln!("Error: {}", err);
        process::exit(err.exit_code());
    }
}

async fn run(cli: &Cli) -> Result<(), AppError> {
    let config = Config::new().map_err(AppError::Configuration)?;
    let backend = parse_storage_backend(&config.storage_backend, config.database_url.as_deref())
        .map_err(|err| AppError::Configuration(err.into()))?;
    if cli.verbose {
        eprintln!("Using storage backend: {:?}", backend);
    }
    let store: Arc<dyn ClientStore> = create_storage_backend(backend)
        .await
        .map_err(|err| AppError::Storage(err.into()))?;

    match &cli.command {
        Commands::List => {
            let clients = store
                .list_clients()
                .await
                .map_err(|err| AppError::Storage(err.into()))?;
            print_clients(cli, &clients)
        }
        Commands::Show { client_id } => {
            let client = store
                .get_client(client_id)
                .await
                .map_err(|err| AppError::Storage(err.into()))?
                .ok_or_else(|| AppError::NotFound(client_id.clone()))?;
            print_clients(cli, std::slice::from_ref(&client))
        }
        Commands::Reconcile => {
            let configured: &Vec<ClientRegistration> = config.oauth_clients.as_ref();
            if cli.verbose {
                eprintln!("Reconciling {} configured clients", configured.len());
            }
            let registry =
                reconcile(configured, ClientPersistence::Persisted, store.clone()).await?;
            let ids = registry
                .client_ids()
                .await
                .map_err(|err| AppError::Storage(err.into()))?;
            println!(
                "Reconciled {} configured clients; {} clients stored",
                configured.len(),
                ids.len()
            );
            Ok(())
        }
    }
}

fn client_view(client: &ClientRegistration, show_secrets: bool) -> Value {
    let mut view = json!(client);
    if !show_secrets && !client.secret.is_empty() {
        view["secret"] = Value::String(SECRET_MASK.to_string());
    }
    view
}

fn print_clients(cli: &Cli, clients: &[ClientRegistration]) -> Result<(), AppError> {
    match cli.format {
        OutputFormat::Json => {
            let views: Vec<Value> = clients
                .iter()
                .map(|client| client_view(client, cli.show_secrets))
                .collect();
            println!("{}", serde_json::to_string(&views)?);
        }
        OutputFormat::JsonPretty => {
            let views: Vec<Value> = clients
                .iter()
                .map(|client| client_view(client, cli.show_secrets))
                .collect();
            println!("{}", serde_json::to_string_pretty(&views)?);
        }
        OutputFormat::Table => {
            println!(
                "{:<24} {:<10} {:<28} {:<24} {:>8}",
                "CLIENT ID", "SECRET", "GRANT TYPES", "SCOPES", "VALIDITY"
            );
            for client in clients {
                let secret = if cli.show_secrets {
                    client.secret.as_str()
                } else if client.secret.is_empty() {
                    "-"
                } else {
                    SECRET_MASK
                };
                println!(
                    "{:<24} {:<10} {:<28} {:<24} {:>8}",
                    client.client_id,
                    secret,
                    join_scopes(&client.grant_types),
                    join_scopes(&client.scopes),
                    client.access_token_validity_seconds
                );
            }
        }
    }
    Ok(())
}
