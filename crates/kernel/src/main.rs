//! Bolt CMS kernel
//!
//! HTTP server and Composer extension hooks.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use bolt_kernel::composer::{
    self, Package, PackageEvent, PackageOperation, RootPackage, ScriptEvent, TracingIo,
};
use bolt_kernel::{AppState, Config, session};

#[derive(Parser, Debug)]
#[command(name = "bolt", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve,

    /// Composer hooks for extensions.
    Extensions {
        #[command(subcommand)]
        command: ExtensionsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ExtensionsCommand {
    /// Write vendor/autoload.json describing installed extensions.
    Dump {
        /// Project directory.
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Vendor directory (default: <project-dir>/vendor).
        #[arg(long)]
        vendor_dir: Option<PathBuf>,
    },

    /// Mirror an installed extension's assets into the web root.
    Install {
        /// The extension's composer.json.
        manifest: PathBuf,

        /// Project directory.
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Root composer.json (default: <project-dir>/composer.json).
        #[arg(long)]
        root: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Extensions { command } => match command {
            ExtensionsCommand::Dump {
                project_dir,
                vendor_dir,
            } => cmd_extensions_dump(&project_dir, vendor_dir),
            ExtensionsCommand::Install {
                manifest,
                project_dir,
                root,
            } => cmd_extensions_install(&manifest, &project_dir, root),
        },
    }
}

async fn serve() -> Result<()> {
    info!("Starting Bolt kernel");

    let config = Config::from_env().context("failed to load configuration")?;
    info!(port = config.port, "Configuration loaded");

    let state = AppState::new(&config)
        .await
        .context("failed to initialize application state")?;

    let same_site = session::same_site_from_str(&config.cookie_same_site);
    let app = match &config.redis_url {
        Some(url) => {
            let session_layer = session::redis_session_layer(url, same_site)
                .await
                .context("failed to create session layer")?;
            bolt_kernel::app(state).layer(session_layer)
        }
        None => bolt_kernel::app(state).layer(session::memory_session_layer(same_site)),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;

    info!(%addr, "Server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn cmd_extensions_dump(project_dir: &Path, vendor_dir: Option<PathBuf>) -> Result<()> {
    let vendor_dir = vendor_dir.unwrap_or_else(|| project_dir.join("vendor"));

    let path = composer::dump(&ScriptEvent {
        vendor_dir,
        project_dir: project_dir.to_path_buf(),
    })?;

    println!("Wrote {}", path.display());
    Ok(())
}

fn cmd_extensions_install(
    manifest: &Path,
    project_dir: &Path,
    root: Option<PathBuf>,
) -> Result<()> {
    let contents = fs::read_to_string(manifest)
        .with_context(|| format!("failed to read {}", manifest.display()))?;
    let package: Package = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse {}", manifest.display()))?;

    let root_path = root.unwrap_or_else(|| project_dir.join("composer.json"));
    let root = RootPackage::load(&root_path)?;

    composer::handle(&PackageEvent {
        operation: PackageOperation::Install { package },
        root: &root,
        project_dir: project_dir.to_path_buf(),
        io: &TracingIo,
    });

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
