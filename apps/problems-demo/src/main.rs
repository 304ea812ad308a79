mod routes;

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use problems_web::{ErrorClassRegistry, ExceptionResolver, ResolverConfig};
use tracing_subscriber::{EnvFilter, Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

/// Demo user directory answering every failure with a JSON problem list
#[derive(Parser)]
#[command(name = "problems-demo")]
#[command(about = "Demo user directory answering every failure with a JSON problem list")]
#[command(version)]
struct Cli {
    /// Path to the problem mappings file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8087)]
    port: u16,

    /// Print effective mappings configuration (JSON) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    if let Some(path) = &cli.config
        && !path.is_file()
    {
        anyhow::bail!("config file does not exist: {}", path.display());
    }

    // 1) defaults -> 2) YAML (if provided) -> 3) env (PROBLEMS__*)
    let config = ResolverConfig::load(cli.config.as_deref())?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let resolver = build_resolver(&config)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(resolver, cli.port).await,
        Commands::Check => {
            println!("Configuration is valid");
            Ok(())
        }
    }
}

fn init_logging(verbose: u8, json: bool) {
    let default_directives = match verbose {
        0 => "info",
        1 => "info,problems_web=debug,problems_demo=debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    // stdout is reserved for command output
    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn build_resolver(config: &ResolverConfig) -> Result<ExceptionResolver> {
    let mut registry = ErrorClassRegistry::with_builtins();
    routes::register_classes(&mut registry)?;

    let resolver = ExceptionResolver::from_config(config, &registry)
        .context("invalid problem mappings")?;
    Ok(routes::declare_mappings(resolver))
}

async fn run_server(resolver: ExceptionResolver, port: u16) -> Result<()> {
    let app = routes::router(Arc::new(resolver), routes::AppState::default());

    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "problems-demo listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("problems-demo stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
