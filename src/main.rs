//! qcat - run named, parameterized SQL reports from a query catalog.

mod cli;

use std::sync::Arc;

use cli::{Cli, Command, RunArgs};
use query_catalog::adapter::ExecutionAdapter;
use query_catalog::catalog::{QueryTemplate, TemplateStore};
use query_catalog::config::{Config, ConnectionConfig};
use query_catalog::db::ResultSet;
use query_catalog::error::{CatalogError, Result};
use query_catalog::runner::{CatalogRunner, RetryPolicy};
use query_catalog::{db, logging, output};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Load .env before clap reads DATABASE_URL
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    logging::init_stderr_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let catalog_paths = if cli.catalogs.is_empty() {
        config.catalog_paths()
    } else {
        cli.catalogs.clone()
    };
    if catalog_paths.is_empty() {
        return Err(CatalogError::config(
            "No catalog files configured. Use --catalog PATH or add [[catalogs]] to the config file",
        ));
    }

    let store = TemplateStore::load_files(&catalog_paths)?;

    match &cli.command {
        Command::List => {
            for template in store.iter() {
                match template.description() {
                    Some(description) => println!("{:<28} {}", template.name(), description),
                    None => println!("{}", template.name()),
                }
            }
        }
        Command::Show { name } => print_template(store.get(name)?),
        Command::Check => {
            println!(
                "{} template(s) OK across {} catalog file(s)",
                store.len(),
                catalog_paths.len()
            );
        }
        Command::Run(args) => run_template(&cli, &config, store, args).await?,
    }

    Ok(())
}

async fn run_template(
    cli: &Cli,
    config: &Config,
    store: TemplateStore,
    args: &RunArgs,
) -> Result<()> {
    let values = args.binding().map_err(CatalogError::config)?;
    let connection = resolve_connection(cli, config)?;
    info!("Connection: {}", connection.display_string());

    let client = db::connect(&connection).await?;
    let adapter = ExecutionAdapter::new(client).with_max_rows(config.runner.max_rows);
    let runner = CatalogRunner::new(Arc::new(store), adapter);

    let timeout = args.timeout(config.runner.default_timeout());
    let outcome = if args.attempts > 1 {
        let policy = RetryPolicy::new(args.attempts, args.retry_delay());
        runner
            .run_with_retry(&args.name, &values, timeout, &policy)
            .await
    } else {
        runner.run(&args.name, &values, timeout).await
    };

    // Close before reporting so the connection is released either way
    let closed = runner.close().await;
    let result = settle(outcome, closed)?;
    println!("{}", output::render(&result, args.format));
    Ok(())
}

/// Picks the run's outcome over a failed close, which is only logged.
fn settle(outcome: Result<ResultSet>, closed: Result<()>) -> Result<ResultSet> {
    if let Err(e) = closed {
        warn!("Failed to close connection: {e}");
    }
    outcome
}

fn print_template(template: &QueryTemplate) {
    println!("{}", template.name());
    if let Some(description) = template.description() {
        println!("  {description}");
    }
    println!();
    println!("{}", template.sql().trim());

    if !template.params().is_empty() {
        println!();
        println!("Parameters:");
        for param in template.params() {
            match &param.default {
                Some(default) => println!(
                    "  {:<20} {:<16} default {}",
                    param.name,
                    param.param_type.to_string(),
                    default
                ),
                None => println!(
                    "  {:<20} {:<16} required",
                    param.name,
                    param.param_type.to_string()
                ),
            }
        }
    }
}

/// Resolves the connection with precedence:
/// 1. --url or DATABASE_URL
/// 2. Named connection from config
/// 3. Default connection from config
fn resolve_connection(cli: &Cli, config: &Config) -> Result<ConnectionConfig> {
    if let Some(url) = &cli.url {
        return ConnectionConfig::from_url(url);
    }

    if let Some(name) = cli.connection_name() {
        return config.get_connection(Some(name)).cloned().ok_or_else(|| {
            CatalogError::config(format!("Connection '{name}' not found in config file"))
        });
    }

    config.get_connection(None).cloned().ok_or_else(|| {
        CatalogError::config(
            "No database connection configured. Use --url, DATABASE_URL, or [connections.default]",
        )
    })
}
