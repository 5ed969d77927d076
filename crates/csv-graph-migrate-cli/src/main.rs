//! csv-graph-migrate CLI - batch-load tabular data into a typed graph store.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use csv_graph_migrate::{
    config, Config, MemoryStore, MigrateError, Orchestrator, Schema, ScriptStore, StoreClient,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "csv-graph-migrate")]
#[command(about = "Batch-load CSV/TSV data into a typed graph store")]
#[command(version)]
struct Cli {
    /// Path to YAML mapping configuration
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Path to YAML schema description
    #[arg(short, long, default_value = "schema.yaml")]
    schema: PathBuf,

    /// Path to status file for resume capability
    #[arg(long, default_value = "migration-status.json")]
    status_file: PathBuf,

    /// Directory for per-dataset row logs
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the migration, resuming from the status file if present
    Migrate {
        /// Reset the status file and start from scratch
        #[arg(long)]
        clean: bool,

        /// Compile and validate without writing anywhere
        #[arg(long)]
        dry_run: bool,

        /// Write rendered statements to this script file
        #[arg(short, long, default_value = "statements.tql")]
        output: PathBuf,
    },

    /// Validate the configuration against schema and data headers
    Validate,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(MigrateError::Config)?;

    let config = Config::load(&cli.config)?;
    let schema = Schema::load(&cli.schema)?;
    let entries = config::resolve(&config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Validate => {
            let report = config::preflight(&entries, &schema);
            for warning in &report.warnings {
                println!("warning: {}", warning);
            }
            for error in &report.errors {
                println!("error: {}", error);
            }
            if report.is_blocking() {
                return Err(MigrateError::Config(format!(
                    "{} blocking error(s)",
                    report.errors.len()
                )));
            }
            println!("Configuration is valid");
            Ok(())
        }

        Commands::Migrate {
            clean,
            dry_run,
            output,
        } => {
            let cancel_token = setup_signal_handler().await?;

            let store: Arc<dyn StoreClient> = if dry_run {
                info!("Dry run: compiling against the in-memory store");
                Arc::new(MemoryStore::new())
            } else {
                info!("Writing statements to {:?}", output);
                Arc::new(ScriptStore::open(&output)?)
            };

            let orchestrator = Orchestrator::new(entries, schema, store)
                .with_status_file(cli.status_file.clone())
                .with_log_dir(cli.log_dir.clone())
                .with_config_hash(config.hash());

            if clean {
                orchestrator.clean()?;
            }

            let result = orchestrator.run(cancel_token).await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                let status_msg = if dry_run {
                    "Dry run completed!"
                } else {
                    "Migration completed!"
                };
                println!("\n{}", status_msg);
                println!("  Run ID: {}", result.run_id);
                println!("  Status: {}", result.status);
                println!("  Duration: {:.2}s", result.duration_seconds);
                println!(
                    "  Datasets: {}/{}",
                    result.datasets_completed, result.datasets_total
                );
                println!("  Rows: {}", result.rows_migrated);
                println!("  Statements: {}", result.statements_submitted);
                println!("  Throughput: {} rows/sec", result.rows_per_second);
                if !result.failed_datasets.is_empty() {
                    println!("  Failed datasets: {:?}", result.failed_datasets);
                }
            }
            Ok(())
        }
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

/// Setup signal handlers for graceful shutdown: the in-flight chunk finishes,
/// the status file is persisted, the process exits.
#[cfg(unix)]
async fn setup_signal_handler() -> Result<CancellationToken, MigrateError> {
    let cancel_token = CancellationToken::new();

    let token_int = cancel_token.clone();
    let token_term = cancel_token.clone();

    tokio::spawn(async move {
        let mut sigint = signal(SignalKind::interrupt()).expect("Failed to setup SIGINT handler");
        sigint.recv().await;
        eprintln!("\nReceived SIGINT. Finishing the in-flight chunk...");
        token_int.cancel();
    });

    tokio::spawn(async move {
        let mut sigterm = signal(SignalKind::terminate()).expect("Failed to setup SIGTERM handler");
        sigterm.recv().await;
        eprintln!("\nReceived SIGTERM. Finishing the in-flight chunk...");
        token_term.cancel();
    });

    Ok(cancel_token)
}

/// Setup signal handler for Windows (only Ctrl-C).
#[cfg(not(unix))]
async fn setup_signal_handler() -> Result<CancellationToken, MigrateError> {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to setup Ctrl-C handler");
        eprintln!("\nReceived Ctrl-C. Finishing the in-flight chunk...");
        token.cancel();
    });

    Ok(cancel_token)
}
