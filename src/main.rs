//! `web-scaffold` binary.
//!
//! ```text
//! web-scaffold [--config PATH] [serve]   run the demo application
//! web-scaffold [--config PATH] routes    print the dispatch table and exit
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use web_scaffold::config::load_effective;
use web_scaffold::observability::{logging, metrics};
use web_scaffold::{app, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "web-scaffold")]
#[command(version, about = "Declarative routing and dispatch demo server", long_about = None)]
struct Cli {
    /// TOML configuration file. Missing file means defaults.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Serve HTTP (default)
    Serve,
    /// Print the discovered routes
    Routes,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_effective(&cli.config)?;
    logging::init_logging(&config.observability);

    tracing::info!(
        config = %cli.config.display(),
        bind_address = %config.listener.bind_address,
        debug = config.app.debug,
        "web-scaffold v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let application = app::build(config.clone())?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Routes => {
            for route in application.routes() {
                println!(
                    "{:<24} {:<28} {}",
                    route.verbs().to_string(),
                    route.pattern().to_string(),
                    route.target()
                );
            }
        }
        Commands::Serve => {
            if config.observability.metrics_enabled {
                metrics::init_metrics(&config.observability.metrics_address)?;
            }

            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");

            let shutdown = Shutdown::new();
            HttpServer::new(Arc::new(application))
                .run(listener, shutdown.listener())
                .await?;

            tracing::info!("Shutdown complete");
        }
    }

    Ok(())
}
