//! # Context Uplink CLI (`uplink`)
//!
//! The `uplink` binary is the primary interface for Context Uplink. It
//! provides commands for indexing project trees, searching the remote index,
//! inspecting the local record, and starting the administrative server.
//!
//! ## Usage
//!
//! ```bash
//! uplink [--config-dir DIR] [--base-url URL] [--token TOKEN] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `uplink index <path>` | Upload a project's changed blobs |
//! | `uplink search <path> "<query>"` | Search the remote index |
//! | `uplink projects` | List locally recorded projects |
//! | `uplink check <path>` | Show whether a path is indexed |
//! | `uplink delete <path>` | Drop a project from the local record |
//! | `uplink serve` | Start the administrative HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # First index of a project
//! uplink index /home/me/project
//!
//! # The same tree through any path dialect maps to one identity
//! uplink check '\\wsl$\Ubuntu\home\me\project'
//! uplink check /mnt/c/Users/me/project
//!
//! # Search (re-indexes first unless AUTO_INDEX_ON_SEARCH = false)
//! uplink search /home/me/project "login handler"
//!
//! # Point at a different service for one invocation
//! uplink --base-url https://staging.example.com index /home/me/project
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use context_uplink::config::{self, ConfigHandle, Overrides};
use context_uplink::identity;
use context_uplink::indexer;
use context_uplink::logging;
use context_uplink::models::{BatchOperation, IndexReport};
use context_uplink::remote::RemoteClient;
use context_uplink::search;
use context_uplink::server;
use context_uplink::store::IndexStore;

/// Context Uplink CLI, the local side of a remote context index.
///
/// All commands read `settings.toml` from the configuration directory,
/// creating it with defaults on first use. `--base-url` and `--token`
/// override the file for the lifetime of the process.
#[derive(Parser)]
#[command(
    name = "uplink",
    about = "Mirror project source trees into a remote context index",
    version,
    long_about = "Context Uplink walks a project tree, slices its text files into fixed line \
    windows, uploads only what changed since the last run, and serves search results from the \
    remote index. Windows, Unix, WSL UNC, and /mnt drive-mount paths all resolve to one project \
    identity."
)]
struct Cli {
    /// Configuration directory holding `settings.toml` and the local record.
    ///
    /// Defaults to `~/.uplink`.
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Override the remote service base URL for this invocation.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Override the API token for this invocation.
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Index a project's working tree into the remote service.
    ///
    /// Scans the tree, uploads changed blobs in batches of BATCH_SIZE, and
    /// retires blobs whose content disappeared. Interrupting is safe: every
    /// acknowledged batch is recorded, so a re-run uploads only the
    /// remainder.
    Index {
        /// Project path in any supported dialect: `/home/...`,
        /// `C:\Users\...`, `\\wsl$\Ubuntu\...`, `/mnt/c/...`.
        path: String,
    },

    /// Search the remote index within one project.
    ///
    /// When AUTO_INDEX_ON_SEARCH is enabled (the default) the project is
    /// re-indexed first so results reflect the working tree. Matching and
    /// ranking happen entirely on the service side.
    Search {
        /// Project path in any supported dialect.
        path: String,

        /// The search query string.
        query: String,
    },

    /// List projects this machine has indexed, with blob counts.
    Projects,

    /// Show whether a path is indexed and under which identity.
    Check {
        /// Project path in any supported dialect.
        path: String,
    },

    /// Drop a project from the local record.
    ///
    /// Remote blobs are left alone; the next index of that tree uploads
    /// from scratch.
    Delete {
        /// Project path in any supported dialect.
        path: String,
    },

    /// Start the administrative HTTP server.
    ///
    /// Exposes configuration and project management over a JSON API for
    /// local tooling.
    Serve {
        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1:8787")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => config::default_config_dir()?,
    };
    let overrides = Overrides {
        base_url: cli.base_url,
        token: cli.token,
    };
    let handle = Arc::new(ConfigHandle::init(config_dir, overrides)?);

    match cli.command {
        Commands::Index { path } => {
            let config = handle.snapshot();
            let project = identity::resolve(&path)?;
            let client = RemoteClient::new(&config)?;
            let mut store = IndexStore::open(&config.data_dir)?;

            let report = indexer::index_project(&config, &mut store, &client, &project).await?;
            print_report(&project.identity, &report);
        }
        Commands::Search { path, query } => {
            let config = handle.snapshot();
            let project = identity::resolve(&path)?;
            let client = RemoteClient::new(&config)?;
            let mut store = IndexStore::open(&config.data_dir)?;

            let hits =
                search::search_project(&config, &mut store, &client, &project, &query).await?;
            println!("{}", search::format_hits(&hits));
        }
        Commands::Projects => {
            let config = handle.snapshot();
            let store = IndexStore::open(&config.data_dir)?;

            if store.is_empty() {
                println!("No indexed projects.");
            } else {
                for (path, blob_count) in store.projects() {
                    println!("{}  ({} blobs)", path, blob_count);
                }
            }
        }
        Commands::Check { path } => {
            let config = handle.snapshot();
            let project = identity::resolve(&path)?;
            let store = IndexStore::open(&config.data_dir)?;

            let blob_count = store.get(&project.identity).len();
            if blob_count > 0 {
                println!("{} is indexed ({} blobs)", project.identity, blob_count);
            } else {
                println!("{} is not indexed", project.identity);
            }
        }
        Commands::Delete { path } => {
            let config = handle.snapshot();
            let project = identity::resolve(&path)?;
            let mut store = IndexStore::open(&config.data_dir)?;

            if store.remove(&project.identity)? {
                println!("Deleted local record for {}", project.identity);
            } else {
                println!("{} is not indexed", project.identity);
            }
        }
        Commands::Serve { bind } => {
            let config = handle.snapshot();
            let store = IndexStore::open(&config.data_dir)?;
            server::run_server(handle.clone(), store, &bind).await?;
        }
    }

    Ok(())
}

/// Print the run summary in the same keyed style as the other commands.
fn print_report(identity: &str, report: &IndexReport) {
    println!("index {}", identity);
    println!("  uploaded: {} blobs", report.uploaded);
    println!("  deleted: {} blobs", report.deleted);
    for warning in &report.warnings {
        println!("  warning: {}", warning);
    }
    for failure in &report.failures {
        let op = match failure.operation {
            BatchOperation::Upload => "upload",
            BatchOperation::Delete => "delete",
        };
        println!(
            "  failed {} batch ({} blobs): {}",
            op, failure.blobs, failure.error
        );
    }
    if report.failures.is_empty() {
        println!("ok");
    } else {
        println!("completed with {} failed batches", report.failures.len());
    }
}
