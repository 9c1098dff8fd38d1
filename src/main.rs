//! CLI entry point for assure-insights

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "assure-insights")]
#[command(version)]
#[command(about = "Server-rendered Insights articles for the Assure website", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Read posts from a JSON fixture file instead of the content store
    #[arg(short, long, global = true)]
    fixtures: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve articles with incremental regeneration
    #[command(alias = "s")]
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,
    },

    /// Pre-render all listed articles into the public folder
    #[command(alias = "g")]
    Generate,

    /// List the article paths that would be pre-rendered
    List,

    /// Render one article to stdout
    Render {
        /// Article slug
        slug: String,
    },

    /// Clean the public folder
    Clean,

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "assure_insights=debug,tower_http=debug,info"
    } else {
        "assure_insights=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("reading current directory")?,
    };
    let fixtures = cli.fixtures.as_deref();

    match cli.command {
        Commands::Serve { port, ip } => {
            let app = assure_insights::Insights::new(&base_dir)?;
            let client = app.client(fixtures)?;
            tracing::info!("Starting server at http://{}:{}", ip, port);
            assure_insights::server::start(&app, client, &ip, port).await?;
        }

        Commands::Generate => {
            let app = assure_insights::Insights::new(&base_dir)?;
            let client = app.client(fixtures)?;
            tracing::info!("Generating articles...");
            app.generate(client.as_ref()).await?;
            println!("Generated successfully!");
        }

        Commands::List => {
            let app = assure_insights::Insights::new(&base_dir)?;
            let client = app.client(fixtures)?;
            assure_insights::commands::list::run(&app, client.as_ref()).await?;
        }

        Commands::Render { slug } => {
            let app = assure_insights::Insights::new(&base_dir)?;
            let client = app.client(fixtures)?;
            assure_insights::commands::render::run(&app, client.as_ref(), &slug).await?;
        }

        Commands::Clean => {
            let app = assure_insights::Insights::new(&base_dir)?;
            tracing::info!("Cleaning public folder...");
            app.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::Version => {
            println!("assure-insights version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
