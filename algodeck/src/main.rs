use algodeck::{api, config::Config};
use algodeck_core::{auth::IdentityGate, services::RepairSweep, Services, Store};
use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "algodeck")]
#[command(about = "Notes and practice questions for algorithm study")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Remove orphaned records once and exit
    Repair,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cli.config).await,
        Command::Repair => repair(cli.config),
    }
}

async fn serve(config: Config) -> Result<()> {
    let mut store = Store::open(&config.data_dir)
        .with_context(|| format!("opening store at {}", config.data_dir.display()))?;
    let report = RepairSweep::run(&mut store);
    info!(
        removed = report.removed(),
        failed = report.failed,
        "startup repair sweep finished"
    );
    let gate = IdentityGate::init(&config.gate_config())?;
    let services = Services::new(store.shared());

    let state = api::AppState::new(services, gate).with_debug_errors(config.debug_errors);
    let origin: HeaderValue = config
        .cors_origin
        .parse()
        .with_context(|| format!("invalid CORS origin {}", config.cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
    let app = api::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, data_dir = %config.data_dir.display(), "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn repair(config: Config) -> Result<()> {
    let mut store = Store::open(&config.data_dir)
        .with_context(|| format!("opening store at {}", config.data_dir.display()))?;
    let report = RepairSweep::run(&mut store);
    println!(
        "removed {} subfolder(s), {} note(s), {} question(s); {} failed",
        report.subfolders, report.notes, report.questions, report.failed
    );
    if report.failed > 0 {
        anyhow::bail!("{} orphaned record(s) could not be removed", report.failed);
    }
    Ok(())
}
