use anyhow::Result;
use clap::{Parser, Subcommand};
use relay_core::PermissionMode;
use relay_infrastructure::ConfigService;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "relay - talk to Claude Code from a chat front-end", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ~/.config/relay/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List projects found in the transcript store
    Projects,
    /// List recent sessions of a project
    Sessions {
        /// Encoded project directory name, e.g. -Users-me-code-app
        project_key: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Show which project owns a session
    Find { session_id: String },
    /// Run a single turn and print the reply
    Ask {
        prompt: String,
        /// Session to continue or create (a new id is generated if omitted)
        #[arg(long)]
        session_id: Option<String>,
        /// Working directory for the assistant
        #[arg(long)]
        cwd: Option<PathBuf>,
        /// Resume the session even if this process has not seen it yet
        #[arg(long)]
        resume: bool,
        #[arg(long)]
        permission_mode: Option<PermissionMode>,
    },
    /// Interactive chat in the terminal
    Chat {
        /// Chat user id checked against allowed_user_ids
        #[arg(long, default_value_t = 0)]
        user_id: i64,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let service = match cli.config {
        Some(path) => ConfigService::with_file(path),
        None => ConfigService::new(),
    };
    let config = service.load()?;

    match cli.command {
        Commands::Projects => commands::store::projects(&config).await?,
        Commands::Sessions { project_key, limit } => {
            commands::store::sessions(&config, &project_key, limit).await?
        }
        Commands::Find { session_id } => commands::store::find(&config, &session_id).await?,
        Commands::Ask {
            prompt,
            session_id,
            cwd,
            resume,
            permission_mode,
        } => {
            let args = commands::ask::AskArgs {
                prompt,
                session_id,
                cwd,
                resume,
                permission_mode,
            };
            commands::ask::run(&config, args).await?
        }
        Commands::Chat { user_id } => commands::chat::run(config, user_id).await?,
    }

    Ok(())
}
