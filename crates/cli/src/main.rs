use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use bookstore_db::EntityStore;
use bookstore_kernel::{settings::Settings, InitCtx, ModuleRegistry};

#[derive(Debug, Parser)]
#[command(name = "bookstore", version, about = "Bookstore inventory API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server until interrupted
    Serve,
    /// Load configuration, open the store and report what would be served
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load bookstore settings")?;
    bookstore_telemetry::init(&settings.telemetry)?;

    match cli.command {
        Command::Serve => serve(settings).await,
        Command::Check => check(settings),
    }
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(
        env = ?settings.environment,
        backend = ?settings.database.backend,
        "bookstore bootstrap starting"
    );

    let store = bookstore_db::connect(&settings.database).context("failed to open entity store")?;
    let registry = build_registry(&store, &settings);

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;

    let served = bookstore_http::start_server(&registry, &settings, shutdown_signal()).await;

    registry.stop_modules().await?;
    served
}

fn check(settings: Settings) -> anyhow::Result<()> {
    let store = bookstore_db::connect(&settings.database).context("failed to open entity store")?;
    let registry = build_registry(&store, &settings);

    let modules: Vec<_> = registry.modules().iter().map(|module| module.name()).collect();
    println!("configuration ok");
    println!("environment: {:?}", settings.environment);
    println!("store: {}", store.backend_name());
    println!("listen: {}:{}", settings.server.host, settings.server.port);
    println!("modules: {}", modules.join(", "));
    Ok(())
}

fn build_registry(store: &Arc<dyn EntityStore>, settings: &Settings) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    bookstore_app::register_all(&mut registry, store, settings);
    registry
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
