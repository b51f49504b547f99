//! CLI entry point for webblog

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "webblog")]
#[command(version)]
#[command(about = "Serve a Markdown blog straight out of an object store", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short = 'C', long, global = true)]
    cwd: Option<PathBuf>,

    /// Configuration file (defaults to webblog.yml in the base directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the blog server
    #[command(alias = "s")]
    Server {
        /// Port to listen on (overrides the configuration)
        #[arg(short, long)]
        port: Option<u16>,

        /// IP address to bind to (overrides the configuration)
        #[arg(short, long)]
        ip: Option<String>,
    },

    /// List posts, newest first
    List,

    /// Print the HTML of a page
    Render {
        /// Request path, `/` for the homepage
        #[arg(default_value = "/")]
        path: String,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "webblog=debug,tower_http=debug,info"
    } else {
        "webblog=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Server { port, ip } => {
            let blog = webblog::Blog::new(&base_dir, cli.config.as_deref())?;
            let ip = ip.unwrap_or_else(|| blog.config.server.ip.clone());
            let port = port.unwrap_or(blog.config.server.port);

            tracing::info!("Starting server at http://{}:{}", ip, port);
            webblog::server::start(&blog, &ip, port).await?;
        }

        Commands::List => {
            let blog = webblog::Blog::new(&base_dir, cli.config.as_deref())?;
            webblog::commands::list::run(&blog).await?;
        }

        Commands::Render { path } => {
            let blog = webblog::Blog::new(&base_dir, cli.config.as_deref())?;
            webblog::commands::render::run(&blog, &path).await?;
        }

        Commands::Version => {
            println!("webblog version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
