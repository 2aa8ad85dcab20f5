use clap::{Parser, Subcommand};
use configuration::{init_tracing, load_config, ConfigArgs, Settings};
use database::{DatabaseName, SchemaOptions};

/// The main entry point for the users/groups service.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse();

    let mut settings = load_config(cli.config.config.as_deref())?;
    // Keep the guard alive so buffered file logs are flushed on exit.
    let _log_guard = init_tracing(&settings.logging)?;

    // Execute the appropriate command
    match cli.command.unwrap_or(Commands::Serve(ServeArgs::default())) {
        Commands::Serve(args) => {
            if let Some(port) = args.port {
                settings.server.port = port;
            }
            tracing::info!(
                db_host = %settings.database.host,
                db_name = %settings.database.name,
                port = settings.server.port,
                "Starting users/groups service."
            );
            web_server::run_server(&settings).await
        }
        Commands::Bootstrap => handle_bootstrap(&settings).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// HTTP service for users, groups and their memberships.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (the default).
    Serve(ServeArgs),
    /// Wait for the database, create the schema and exit.
    Bootstrap,
}

#[derive(Parser, Default)]
struct ServeArgs {
    /// Override the configured listening port.
    #[arg(long)]
    port: Option<u16>,
}

// ==============================================================================
// Bootstrap Command Logic
// ==============================================================================

/// Runs the startup gate and the schema bootstrap without serving requests.
async fn handle_bootstrap(settings: &Settings) -> anyhow::Result<()> {
    let database = DatabaseName::new(settings.database.name.clone())?;
    let pool = database::connect(&settings.database);
    let options = SchemaOptions {
        unique_memberships: settings.membership.unique_pairs,
    };

    database::bootstrap(&pool, &database, options, settings.database.retry_interval).await?;
    pool.close().await;

    tracing::info!(database = %database, "Bootstrap finished.");
    Ok(())
}
