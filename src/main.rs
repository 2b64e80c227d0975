use clap::Parser;
use tracing_subscriber::{self, EnvFilter};

use rsmark::cli::Cli;
use rsmark::commands;
use rsmark::config::AppConfig;
use rsmark::state::AppContext;

#[tokio::main]
async fn main() {
    // Initialize tracing with a sensible default when RUST_LOG isn't set
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(env_filter)
        .init();

    let cli = Cli::parse();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("rsmark: {}", e);
            std::process::exit(1);
        }
    };

    // An interrupt closes the process; committed mutations persist and
    // any partial projection is reconciled by the next export.
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("rsmark: interrupted");
            std::process::exit(1);
        }
    });

    let ctx = AppContext::new(config, cli.name.clone());
    match commands::dispatch(&ctx, cli.command).await {
        Ok(()) => {}
        Err(e) => {
            if e.is_benign() {
                println!("{}", e);
            } else {
                eprintln!("rsmark: {}", e);
            }
            std::process::exit(e.exit_code());
        }
    }
}
