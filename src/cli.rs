//! Command-line argument parsing.
//!
//! Uses clap to parse the `qcat` subcommands.

use clap::{Parser, Subcommand};
use query_catalog::binder::ParameterBinding;
use query_catalog::db::Value;
use query_catalog::output::OutputFormat;
use std::path::PathBuf;
use std::time::Duration;

/// Run named, parameterized SQL reports from a query catalog.
#[derive(Parser, Debug)]
#[command(name = "qcat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Catalog file to load (repeatable; overrides catalogs from the config file)
    #[arg(long = "catalog", value_name = "PATH", global = true)]
    pub catalogs: Vec<PathBuf>,

    /// Database URL (postgres://... or sqlite:...)
    #[arg(long, value_name = "URL", env = "DATABASE_URL", global = true)]
    pub url: Option<String>,

    /// Use named connection from config
    #[arg(short = 'c', long, value_name = "NAME", global = true)]
    pub connection: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List templates in the catalog
    List,

    /// Show a template's SQL and parameters
    Show {
        /// Template name
        name: String,
    },

    /// Load every catalog file and report whether all templates are valid
    Check,

    /// Run a template
    Run(RunArgs),
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Template name
    pub name: String,

    /// Parameter value as key=value (repeatable)
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub params: Vec<(String, String)>,

    /// Timeout in seconds (defaults to the configured runner timeout)
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Output format: table or json
    #[arg(short, long, value_name = "FORMAT", default_value = "table")]
    pub format: OutputFormat,

    /// Total attempts for backend failures (1 disables retries)
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub attempts: u32,

    /// Delay before the first retry, doubled after each failure
    #[arg(long, value_name = "MS", default_value_t = 500)]
    pub retry_delay_ms: u64,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(query_catalog::config::Config::default_path)
    }

    /// Returns the named connection to use, if specified.
    pub fn connection_name(&self) -> Option<&str> {
        self.connection.as_deref()
    }
}

impl RunArgs {
    /// Collects `--param` pairs into a binding. Values stay text; the binder coerces them.
    pub fn binding(&self) -> std::result::Result<ParameterBinding, String> {
        let mut binding = ParameterBinding::new();
        for (key, value) in &self.params {
            if binding
                .insert(key.clone(), Value::String(value.clone()))
                .is_some()
            {
                return Err(format!("Parameter '{key}' given more than once"));
            }
        }
        Ok(binding)
    }

    pub fn timeout(&self, default: Duration) -> Duration {
        self.timeout.map(Duration::from_secs).unwrap_or(default)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Parses `key=value`. The value may itself contain `=`.
fn parse_assignment(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid parameter '{s}'. Expected KEY=VALUE"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("Invalid parameter '{s}'. Key is empty"));
    }
    Ok((key.to_string(), value.to_string()))
}
