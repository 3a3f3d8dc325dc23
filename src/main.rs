use std::{path::Path, sync::Arc};

use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use fanout::{
    BatchGateway, GracefulShutdown, HttpClientAdapter,
    adapters::build_router,
    config::{GatewayConfig, GatewayConfigValidator, load_config},
    tracing_setup,
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(short, long, default_value = "config.yaml")]
    config: String,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        #[clap(short, long, default_value = "config.yaml")]
        config: String,
    },
    /// Initialize a new configuration file
    Init {
        /// Output path for the new config file
        #[clap(short, long, default_value = "config.yaml")]
        config: String,
    },
    /// Start the gateway server (default)
    Serve {
        /// Configuration file to use
        #[clap(short, long, default_value = "config.yaml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    let (command, config_path) = match args.command {
        Some(Commands::Validate { config }) => ("validate", config),
        Some(Commands::Init { config }) => ("init", config),
        Some(Commands::Serve { config }) => ("serve", config),
        None => ("serve", args.config), // Default to serve with config from args
    };

    match command {
        "validate" => validate_config_command(&config_path).await,
        "init" => init_config_command(&config_path),
        _ => serve(&config_path).await,
    }
}

async fn validate_config_command(config_path: &str) -> Result<()> {
    let config = load_config(config_path)
        .await
        .wrap_err_with(|| format!("Failed to load config from {config_path}"))?;
    GatewayConfigValidator::validate(&config)
        .map_err(|e| eyre!("Configuration is invalid: {e}"))?;
    println!("Configuration {config_path} is valid");
    Ok(())
}

fn init_config_command(config_path: &str) -> Result<()> {
    if Path::new(config_path).exists() {
        return Err(eyre!("Refusing to overwrite existing file {config_path}"));
    }

    let starter = r#"# Fanout gateway configuration
listen_addr: "127.0.0.1:3000"
batch_path: "/batch"

# Envelope limits and execution
max_requests: 20
concurrency: 8
request_timeout_secs: 30
# batch_timeout_secs: 60

# Header policy
default_headers: {}
forward_headers: []
inherit_headers: false

# Outbound URL policy
local_only: true
https_always: false

log:
  level: "info"
  json: false
"#;

    std::fs::write(config_path, starter)
        .wrap_err_with(|| format!("Failed to write {config_path}"))?;
    println!("Wrote starter configuration to {config_path}");
    Ok(())
}

async fn serve(config_path: &str) -> Result<()> {
    let config = if Path::new(config_path).exists() {
        load_config(config_path)
            .await
            .wrap_err_with(|| format!("Failed to load config from {config_path}"))?
    } else {
        eprintln!("Config file {config_path} not found, using defaults");
        GatewayConfig::default()
    };
    GatewayConfigValidator::validate(&config)
        .map_err(|e| eyre!("Configuration is invalid: {e}"))?;

    tracing_setup::init_tracing_with_config(&config.log.level, config.log.json)?;

    let config = Arc::new(config);
    let client = Arc::new(HttpClientAdapter::new()?);
    let gateway = Arc::new(BatchGateway::new(Arc::clone(&config), client));
    let router = build_router(gateway);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .wrap_err_with(|| format!("Failed to bind {}", config.listen_addr))?;
    tracing::info!(
        "Fanout gateway listening on {} (batch endpoint: {})",
        config.listen_addr,
        config.batch_path
    );

    let shutdown = Arc::new(GracefulShutdown::new());
    let signal_handler = Arc::clone(&shutdown);
    tokio::spawn(async move {
        if let Err(e) = signal_handler.run_signal_handler().await {
            tracing::error!("Signal handler failed: {}", e);
        }
    });

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.wait_for_shutdown().await })
        .await
        .wrap_err("Server error")?;

    tracing::info!("Fanout gateway stopped");
    Ok(())
}
