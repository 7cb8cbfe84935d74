//! # MailVault Console
//!
//! Terminal client for a MailVault email-archive server: upload PST/OST
//! archives, follow processing over the event channel, search the corpus,
//! chat with the RAG pipeline, and run forensic queries.
//!
//! ## Usage
//!
//! ```sh
//! mailvault login --email analyst@example.com
//! mailvault upload ./mailbox.pst --watch
//! mailvault search "invoice march"
//! mailvault chat
//! mailvault forensic evidence
//! ```

mod commands;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mv_client::{ApiClient, TokenStore};
use mv_common::AppConfig;

#[derive(Parser)]
#[command(name = "mailvault", version, about = "MailVault archive console")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Authenticate against the server and store the session
    Login(commands::auth::LoginArgs),
    /// Create a new account
    Register(commands::auth::RegisterArgs),
    /// End the session and forget stored credentials
    Logout,
    /// Show the currently authenticated user
    Whoami,
    /// Upload a PST/OST archive
    Upload(commands::upload::UploadArgs),
    /// List or manage uploaded archives
    #[command(subcommand)]
    Files(commands::upload::FilesCommand),
    /// Inspect or manage processing tasks
    #[command(subcommand)]
    Tasks(commands::tasks::TasksCommand),
    /// Search the archived emails
    Search(commands::search::SearchArgs),
    /// Browse emails
    #[command(subcommand)]
    Emails(commands::emails::EmailsCommand),
    /// Interactive chat over the archive
    Chat(commands::chat::ChatArgs),
    /// LLM provider inspection and settings
    #[command(subcommand)]
    Rag(commands::rag::RagCommand),
    /// Archive-wide statistics
    Stats,
    /// Forensic queries: audit trail, evidence, timeline, header analysis
    #[command(subcommand)]
    Forensic(commands::forensic::ForensicCommand),
}

/// Shared handles every command needs.
pub struct Ctx {
    pub config: AppConfig,
    pub tokens: TokenStore,
    pub api: ApiClient,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let tokens = TokenStore::persistent();
    let api = ApiClient::new(&config, tokens.clone())?;
    let ctx = Ctx {
        config,
        tokens,
        api,
    };

    match cli.command {
        Command::Login(args) => commands::auth::login(&ctx, args).await,
        Command::Register(args) => commands::auth::register(&ctx, args).await,
        Command::Logout => commands::auth::logout(&ctx).await,
        Command::Whoami => commands::auth::whoami(&ctx).await,
        Command::Upload(args) => commands::upload::upload(&ctx, args).await,
        Command::Files(cmd) => commands::upload::files(&ctx, cmd).await,
        Command::Tasks(cmd) => commands::tasks::run(&ctx, cmd).await,
        Command::Search(args) => commands::search::run(&ctx, args).await,
        Command::Emails(cmd) => commands::emails::run(&ctx, cmd).await,
        Command::Chat(args) => commands::chat::run(&ctx, args).await,
        Command::Rag(cmd) => commands::rag::run(&ctx, cmd).await,
        Command::Stats => commands::stats::run(&ctx).await,
        Command::Forensic(cmd) => commands::forensic::run(&ctx, cmd).await,
    }
}
