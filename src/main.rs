mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wordday::config::Config;

#[derive(Parser)]
#[command(
    name = "wordday",
    version,
    about = "Daily word puzzle answers, articles and background jobs",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML config file (defaults to WORDDAY_* environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the config file
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API and the background scheduler
    Serve {
        /// Bind host
        #[arg(long)]
        host: Option<String>,

        /// Bind port
        #[arg(short, long)]
        port: Option<u16>,

        /// Serve the API without starting background jobs
        #[arg(long, default_value = "false")]
        no_scheduler: bool,
    },

    /// Print today's answer
    Resolve {
        /// Drop the cached answer first
        #[arg(long, default_value = "false")]
        force: bool,

        /// Print JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Generate and store today's articles
    Generate {
        /// Use this word instead of resolving one
        #[arg(short, long)]
        word: Option<String>,
    },

    /// Show content store statistics
    Stats {
        /// Print JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Remove every stored article and the snapshot
    Clear {
        /// Confirm
        #[arg(long, default_value = "false")]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(format) = &cli.log_format {
        config.logging.format = format.clone();
    }

    // Initialize tracing/logging
    setup_tracing(&config.logging.format, &config.logging.level, cli.verbose)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "wordday starting");

    match cli.command {
        Commands::Serve {
            host,
            port,
            no_scheduler,
        } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            tracing::info!(
                host = %config.server.host,
                port = %config.server.port,
                no_scheduler,
                "Starting serve command"
            );
            commands::serve(config, no_scheduler).await?;
        }

        Commands::Resolve { force, json } => {
            tracing::info!(force, "Starting resolve command");
            commands::resolve(config, force, json).await?;
        }

        Commands::Generate { word } => {
            tracing::info!(word = ?word, "Starting generate command");
            commands::generate(config, word).await?;
        }

        Commands::Stats { json } => {
            commands::stats(config, json).await?;
        }

        Commands::Clear { yes } => {
            commands::clear(config, yes).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("wordday=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("wordday={level},warn"))
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("wordday=info,warn"))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
