use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use checker_builder::{config, logging};

mod cmd;

#[derive(Parser)]
#[command(name = "checker")]
#[command(version, about = "Build, store and publish checker configurations")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding `.checker/checker.toml` (defaults to the current directory)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Base URL of the persistence endpoint. Overrides checker.toml and CHECKER_BASE_URL.
    #[arg(long, global = true)]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the persistence endpoint
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        /// Database path
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Enable dev mode (CORS permissive, bind all interfaces)
        #[arg(long)]
        dev: bool,
    },
    /// Create the database and exit
    InitDb {
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// List checkers stored on the server
    List,
    /// Download a checker document
    Pull {
        id: String,

        /// Write the document here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Upload a checker document from a JSON file
    Push { file: PathBuf },
    /// Publish the stored version of a checker
    Publish { id: String },
    /// Apply a JSON array of actions to a document file, offline
    Apply {
        document: PathBuf,
        actions: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// View, validate or create checker.toml
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default checker.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let mut settings = config::resolve(&project_dir)?;
    if let Some(server) = &cli.server {
        settings.client.base_url = server.clone();
    }

    let level = if cli.verbose {
        "debug"
    } else {
        settings.logging.level.as_str()
    };
    logging::init(level, settings.logging.json)?;

    match &cli.command {
        Commands::Serve { port, db_path, dev } => {
            cmd::cmd_serve(&project_dir, &settings, *port, db_path.as_deref(), *dev).await?
        }
        Commands::InitDb { db_path } => {
            cmd::cmd_init_db(&project_dir, &settings, db_path.as_deref())?
        }
        Commands::List => cmd::cmd_list(&settings).await?,
        Commands::Pull { id, output } => cmd::cmd_pull(&settings, id, output.as_deref()).await?,
        Commands::Push { file } => cmd::cmd_push(&settings, file).await?,
        Commands::Publish { id } => cmd::cmd_publish(&settings, id).await?,
        Commands::Apply {
            document,
            actions,
            output,
        } => cmd::cmd_apply(document, actions, output.as_deref())?,
        Commands::Config { command } => cmd::cmd_config(&project_dir, &settings, command.clone())?,
    }

    Ok(())
}
