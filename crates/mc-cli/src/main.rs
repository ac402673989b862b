mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{activity::ActivitySubcommand, config::ConfigSubcommand, task::TaskSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "mc",
    about = "Mission Control: shared JSON documents with optimistic concurrency",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .mission-control/ or .git/)
    #[arg(long, global = true, env = "MC_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Mission Control in the current project
    Init,

    /// List stored document keys
    Keys,

    /// Print a document and the version it was read at
    Get { key: String },

    /// Print the current version of a document
    Version { key: String },

    /// Replace a document with the contents of FILE ("-" reads stdin)
    Put {
        key: String,
        file: PathBuf,
        /// Only write if the document is still at this version
        #[arg(long)]
        expect: Option<String>,
    },

    /// Deep-merge a JSON patch into a document
    Patch {
        key: String,
        /// JSON object to merge
        #[arg(value_name = "JSON")]
        patch: String,
        /// Only write if the document is still at this version (no retry)
        #[arg(long)]
        expect: Option<String>,
    },

    /// Manage the shared task board
    Task {
        #[command(subcommand)]
        subcommand: TaskSubcommand,
    },

    /// Append to and read the activity log
    Activity {
        #[command(subcommand)]
        subcommand: ActivitySubcommand,
    },

    /// Inspect the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Run the HTTP API
    Serve {
        /// Port to listen on (0 = OS-assigned)
        #[arg(long, default_value = "3141")]
        port: u16,

        /// Don't open browser automatically
        #[arg(long)]
        no_open: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Keys => cmd::doc::keys(&root, cli.json),
        Commands::Get { key } => cmd::doc::get(&root, &key, cli.json),
        Commands::Version { key } => cmd::doc::version(&root, &key, cli.json),
        Commands::Put { key, file, expect } => {
            cmd::doc::put(&root, &key, &file, expect.as_deref(), cli.json)
        }
        Commands::Patch { key, patch, expect } => {
            cmd::doc::patch(&root, &key, &patch, expect.as_deref(), cli.json)
        }
        Commands::Task { subcommand } => cmd::task::run(&root, subcommand, cli.json),
        Commands::Activity { subcommand } => cmd::activity::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Serve { port, no_open } => cmd::serve::run(&root, port, no_open),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
