//! Cluster Claimer CLI
//!
//! Runs the lease server and talks to a running one.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

mod api_client;
mod commands;
mod config;
mod validator;

use api_client::ApiClient;
use commands::{decode_to_yaml, read_input, run_server, ServeConfig};
use config::AppConfig;
use kc_observability::LoggingConfig;
use validator::ConfigValidator;

#[derive(Parser)]
#[command(name = "cluster-claimer")]
#[command(version)]
#[command(about = "Exclusive, time-bounded leases on a pool of Kubernetes clusters", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// API server URL (for remote commands)
    #[arg(long, env = "KC_API_URL", default_value = "http://localhost:8080")]
    api_url: String,

    /// Bearer token for remote commands
    #[arg(long, env = "KC_AUTH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Port to listen on (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Disable Swagger UI
        #[arg(long)]
        no_swagger: bool,

        /// Validate configuration and exit without starting the server
        #[arg(long)]
        validate_only: bool,
    },

    /// Validate configuration
    Validate {
        /// Configuration file to validate
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show current configuration
    Config {
        /// Show secrets (redacted by default)
        #[arg(long)]
        show_secrets: bool,
    },

    /// Lease a cluster from a running server
    Lease {
        /// Lease duration in seconds
        #[arg(short, long, default_value = "3600")]
        duration: u64,

        /// Write the decoded kubeconfig to this file
        #[arg(long, value_name = "FILE")]
        kubeconfig_out: Option<PathBuf>,
    },

    /// Release a lease
    Release {
        /// Lease token
        token: Uuid,
    },

    /// List active leases
    Leases,

    /// List the cluster pool
    Clusters,

    /// Decode a kubeconfig string into YAML
    Decode {
        /// Encoded kubeconfig, or `-` to read stdin
        kubeconfig: String,

        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = load_config(&config_path, cli.config.is_some(), cli.verbose)?;
    config.apply_env_overrides();

    let json_logs = config.logging.json_format || cli.format == OutputFormat::Json;
    let (mut logging, level_error) =
        match LoggingConfig::from_level_name(&config.logging.level, json_logs) {
            Ok(logging) => (logging, None),
            Err(e) => (
                LoggingConfig {
                    json_format: json_logs,
                    ..LoggingConfig::default()
                },
                Some(e),
            ),
        };
    if cli.verbose {
        logging.level = tracing::Level::DEBUG;
    }
    kc_observability::try_init_logging(logging).context("Failed to initialize logging")?;
    if let Some(e) = level_error {
        tracing::warn!(error = %e, "Falling back to info logging");
    }

    match cli.command {
        Commands::Serve {
            port,
            host,
            no_swagger,
            validate_only,
        } => {
            let serve_config = ServeConfig::from_app_config(&config, port, host, no_swagger);
            cmd_serve(serve_config, config, validate_only).await
        }
        Commands::Validate { config: cfg_path } => cmd_validate(cfg_path.unwrap_or(config_path)),
        Commands::Config { show_secrets } => cmd_config(&config, show_secrets, cli.format),
        Commands::Lease {
            duration,
            kubeconfig_out,
        } => {
            let client = ApiClient::new(&cli.api_url, cli.token)?;
            cmd_lease(&client, duration, kubeconfig_out.as_deref(), cli.format).await
        }
        Commands::Release { token } => {
            let client = ApiClient::new(&cli.api_url, cli.token)?;
            cmd_release(&client, token, cli.format).await
        }
        Commands::Leases => {
            let client = ApiClient::new(&cli.api_url, cli.token)?;
            cmd_leases(&client, cli.format).await
        }
        Commands::Clusters => {
            let client = ApiClient::new(&cli.api_url, cli.token)?;
            cmd_clusters(&client, cli.format).await
        }
        Commands::Decode { kubeconfig, output } => cmd_decode(&kubeconfig, output.as_deref()),
    }
}

fn default_config_path() -> PathBuf {
    if let Some(dirs) = directories::ProjectDirs::from("io", "cluster-claimer", "cluster-claimer")
    {
        dirs.config_dir().join("config.yaml")
    } else {
        PathBuf::from("config/default.yaml")
    }
}

/// Loads the config file. A missing default file falls back to defaults;
/// a file named with `--config` must exist.
fn load_config(path: &Path, explicit: bool, verbose: bool) -> Result<AppConfig> {
    if !explicit && !path.exists() {
        if verbose {
            eprintln!("Using default configuration (no config file found)");
        }
        return Ok(AppConfig::default());
    }
    AppConfig::load(path)
}

async fn cmd_serve(
    serve_config: ServeConfig,
    app_config: AppConfig,
    validate_only: bool,
) -> Result<()> {
    println!("{}", "Validating configuration...".cyan());

    let validation_result = ConfigValidator::validate(&app_config);
    validation_result.print();

    if validation_result.has_errors() {
        println!();
        println!(
            "{}",
            "Server startup aborted due to configuration errors. Fix the errors above and try again."
                .red()
                .bold()
        );
        std::process::exit(1);
    }

    if validate_only {
        println!();
        println!(
            "{}",
            "Configuration is valid. Server can be started."
                .green()
                .bold()
        );
        return Ok(());
    }

    println!();
    run_server(serve_config, app_config).await
}

fn cmd_validate(config_path: PathBuf) -> Result<()> {
    println!(
        "Validating configuration: {}",
        config_path.display().to_string().cyan()
    );

    let mut config = match AppConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("{}: {:#}", "Configuration file error".red().bold(), e);
            std::process::exit(1);
        }
    };
    config.apply_env_overrides();

    let validation_result = ConfigValidator::validate(&config);
    validation_result.print();

    println!();
    println!("{}", "Configuration Summary".bold());
    println!("─────────────────────");
    println!("  Inventory source: {}", config.inventory.source);
    println!("  Static clusters: {}", config.inventory.clusters.len());
    println!("  Max lease: {}s", config.leases.max_duration_secs);
    println!(
        "  Listen: {}:{}",
        config.server.host, config.server.port
    );

    if validation_result.has_errors() {
        println!();
        println!(
            "{}",
            "Configuration validation failed. Fix the errors above."
                .red()
                .bold()
        );
        std::process::exit(1);
    } else if validation_result.has_warnings() {
        println!();
        println!(
            "{}",
            "Configuration is valid with warnings. Review the warnings above."
                .yellow()
                .bold()
        );
    } else {
        println!();
        println!("{}", "Configuration is valid.".green().bold());
    }

    Ok(())
}

fn cmd_config(config: &AppConfig, show_secrets: bool, format: OutputFormat) -> Result<()> {
    let display_config = if show_secrets {
        config.clone()
    } else {
        config.redact_secrets()
    };

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&display_config)?);
    } else {
        print!("{}", serde_yaml::to_string(&display_config)?);
    }

    Ok(())
}

async fn cmd_lease(
    client: &ApiClient,
    duration: u64,
    kubeconfig_out: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let lease = client.create_lease(duration).await?;

    if let Some(path) = kubeconfig_out {
        let yaml = decode_to_yaml(&lease.kube_config)?;
        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write kubeconfig: {}", path.display()))?;
    }

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&lease)?);
    } else {
        println!("{} {}", "Leased:".green().bold(), lease.cluster_name);
        println!("  {} {}", "Token:".cyan(), lease.token);
        println!("  {} {}", "Endpoint:".cyan(), lease.ip);
        println!("  {} {}", "Expires:".cyan(), lease.expires_at.to_rfc3339());
        match kubeconfig_out {
            Some(path) => println!("  {} {}", "Kubeconfig:".cyan(), path.display()),
            None => println!("  {} {}", "Kubeconfig:".cyan(), lease.kube_config),
        }
    }

    Ok(())
}

async fn cmd_release(client: &ApiClient, token: Uuid, format: OutputFormat) -> Result<()> {
    client.release_lease(token).await?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::json!({ "released": token }));
    } else {
        println!("{} {}", "Released".green(), token);
    }
    Ok(())
}

async fn cmd_leases(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let leases = client.list_leases().await?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&leases)?);
        return Ok(());
    }

    println!("{}", "Active Leases".bold());
    println!("─────────────");
    if leases.is_empty() {
        println!("No active leases");
    }
    for lease in leases {
        println!(
            "  {} {} (expires {})",
            lease.token.to_string().cyan(),
            lease.cluster_name,
            lease.expires_at.to_rfc3339()
        );
    }
    Ok(())
}

async fn cmd_clusters(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let clusters = client.list_clusters().await?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&clusters)?);
        return Ok(());
    }

    println!("{}", "Cluster Pool".bold());
    println!("────────────");
    if clusters.is_empty() {
        println!("No clusters in inventory");
    }
    for cluster in clusters {
        let state = if cluster.leased {
            "leased".yellow()
        } else {
            "free".green()
        };
        println!("  {} [{}] {}", cluster.name, state, cluster.endpoint);
    }
    Ok(())
}

fn cmd_decode(input: &str, output: Option<&Path>) -> Result<()> {
    let encoded = read_input(input)?;
    let yaml = decode_to_yaml(&encoded)?;

    match output {
        Some(path) => std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write kubeconfig: {}", path.display()))?,
        None => print!("{}", yaml),
    }
    Ok(())
}
